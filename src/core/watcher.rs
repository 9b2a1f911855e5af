use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;
use anyhow::{Context, Result};
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use super::events::{EventError, RawEvent, RawEventKind};
use super::listener::{Listener, Outcome};

/// Maps a notify event kind onto the raw kinds listeners understand.
///
/// `Modify(Name(Both))` is skipped: notify reports it in addition to the
/// separate `From` and `To` events of the same rename.
pub fn raw_kind(kind: &EventKind) -> Option<RawEventKind> {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => Some(RawEventKind::CloseWrite),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(RawEventKind::MovedTo),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(RawEventKind::MovedFrom),
        EventKind::Remove(_) => Some(RawEventKind::Delete),
        _ => None,
    }
}

/// Converts one notify event into raw events, one per path.
pub fn raw_events(event: &Event) -> Result<Vec<RawEvent>, EventError> {
    let Some(kind) = raw_kind(&event.kind) else {
        return Ok(Vec::new());
    };

    if event.paths.is_empty() {
        return Err(EventError::missing_path(kind));
    }

    Ok(event
        .paths
        .iter()
        .map(|path| RawEvent::new(kind, path.clone()))
        .collect())
}

struct WatchedDir {
    root: PathBuf,
    listeners: Vec<Listener>,
}

/// Watches directories (non-recursively) and feeds their events to listeners.
///
/// Nothing happens in the background: events queue up in notify's channel
/// until [`FileMonitor::pump`] delivers them on the caller's thread, one at a
/// time and in arrival order.
pub struct FileMonitor {
    watcher: RecommendedWatcher,
    event_rx: Receiver<notify::Result<Event>>,
    dirs: Vec<WatchedDir>,
}

impl FileMonitor {
    pub fn new() -> Result<Self> {
        let (tx, event_rx) = mpsc::channel::<notify::Result<Event>>();

        let watcher = notify::recommended_watcher(tx)
            .context("Failed to create file system watcher")?;

        Ok(Self {
            watcher,
            event_rx,
            dirs: Vec::new(),
        })
    }

    /// Start delivering events for files directly inside `path` to `listener`.
    pub fn add_listener<P: AsRef<Path>>(&mut self, path: P, listener: Listener) -> Result<()> {
        let path = path.as_ref();
        let root = path
            .canonicalize()
            .with_context(|| format!("Failed to resolve watch path: {}", path.display()))?;

        if let Some(dir) = self.dirs.iter_mut().find(|dir| dir.root == root) {
            tracing::info!("Adding {} to {}", listener.id(), root.display());
            dir.listeners.push(listener);
            return Ok(());
        }

        self.watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to start watching directory: {}", root.display()))?;

        tracing::info!("Watching {} with {}", root.display(), listener.id());
        self.dirs.push(WatchedDir {
            root,
            listeners: vec![listener],
        });
        Ok(())
    }

    pub fn watched_paths(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(|dir| dir.root.as_path())
    }

    /// Deliver every queued event, waiting up to `timeout` for the first one.
    ///
    /// Returns the number of domain events dispatched, or an error once the
    /// watcher has shut down.
    pub fn pump(&self, timeout: Duration) -> Result<usize> {
        let first = match self.event_rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => return Ok(0),
            Err(RecvTimeoutError::Disconnected) => anyhow::bail!("File watcher stopped"),
        };

        let mut dispatched = self.deliver(first);
        while let Ok(result) = self.event_rx.try_recv() {
            dispatched += self.deliver(result);
        }
        Ok(dispatched)
    }

    fn deliver(&self, result: notify::Result<Event>) -> usize {
        let event = match result {
            Ok(event) => event,
            Err(err) => {
                tracing::error!("File watcher error: {}", err);
                return 0;
            }
        };

        let raw = match raw_events(&event) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!("Skipping notification: {}", err);
                return 0;
            }
        };

        let mut dispatched = 0;
        for raw in &raw {
            let parent = raw.path().ok().and_then(Path::parent);
            for dir in self.dirs.iter().filter(|dir| parent == Some(dir.root.as_path())) {
                for listener in &dir.listeners {
                    if listener.handle(raw) == Outcome::Dispatched {
                        dispatched += 1;
                    }
                }
            }
        }
        dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |event, path| event.add_path(PathBuf::from(*path)))
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            raw_kind(&EventKind::Access(AccessKind::Close(AccessMode::Write))),
            Some(RawEventKind::CloseWrite)
        );
        assert_eq!(
            raw_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::To))),
            Some(RawEventKind::MovedTo)
        );
        assert_eq!(
            raw_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::From))),
            Some(RawEventKind::MovedFrom)
        );
        assert_eq!(raw_kind(&EventKind::Remove(RemoveKind::File)), Some(RawEventKind::Delete));
        assert_eq!(raw_kind(&EventKind::Remove(RemoveKind::Any)), Some(RawEventKind::Delete));
    }

    #[test]
    fn test_unmapped_kinds() {
        assert_eq!(raw_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))), None);
        assert_eq!(raw_kind(&EventKind::Create(CreateKind::File)), None);
        assert_eq!(raw_kind(&EventKind::Modify(ModifyKind::Data(DataChange::Any))), None);
        assert_eq!(raw_kind(&EventKind::Access(AccessKind::Close(AccessMode::Read))), None);
    }

    #[test]
    fn test_raw_events_per_path() {
        let raw = raw_events(&event(EventKind::Remove(RemoveKind::File), &["/w/a.mp3", "/w/b.ogg"])).unwrap();

        assert_eq!(
            raw,
            vec![
                RawEvent::new(RawEventKind::Delete, "/w/a.mp3"),
                RawEvent::new(RawEventKind::Delete, "/w/b.ogg"),
            ]
        );
    }

    #[test]
    fn test_raw_events_without_path() {
        let err = raw_events(&event(EventKind::Remove(RemoveKind::File), &[])).unwrap_err();
        assert!(matches!(err, EventError::MalformedRawEvent { kind: RawEventKind::Delete, .. }));
    }

    #[test]
    fn test_ignored_event_without_path_is_fine() {
        let raw = raw_events(&event(EventKind::Create(CreateKind::Any), &[])).unwrap();
        assert!(raw.is_empty());
    }
}
