//! Listeners turning raw filesystem events into domain events
//!
//! A [`Listener`] plays one of two roles. An organize listener reports files
//! that finished arriving in a drop directory; a store-watch listener mirrors
//! additions and removals in a library directory. Which raw kinds a role
//! reacts to, and what it turns them into, is decided by [`ListenerRole::route`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use super::dispatch::{Channel, Dispatcher, ListenerId};
use super::events::{DomainEvent, RawEvent, RawEventKind};
use super::filter::{include_only, ExtensionFilter};

/// Builds a domain event from the path of a raw event.
pub type Translator = fn(&Path) -> DomainEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerRole {
    Organize,
    StoreWatch,
}

impl ListenerRole {
    /// The translator this role applies to `kind`, if it handles it at all.
    pub fn route(self, kind: RawEventKind) -> Option<Translator> {
        use RawEventKind::*;

        match (self, kind) {
            (ListenerRole::Organize, CloseWrite | MovedTo) => Some(DomainEvent::organize_file),
            (ListenerRole::Organize, MovedFrom | Delete) => None,
            (ListenerRole::StoreWatch, CloseWrite | MovedTo) => Some(DomainEvent::new_file),
            (ListenerRole::StoreWatch, MovedFrom | Delete) => Some(DomainEvent::delete_file),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerRole::Organize => "organize",
            ListenerRole::StoreWatch => "store-watch",
        }
    }
}

impl fmt::Display for ListenerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a single raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Dispatched,
    /// The path's extension is not supported
    Filtered,
    /// The role does not react to this kind
    Unhandled,
    Malformed,
}

pub struct Listener {
    id: ListenerId,
    filter: Arc<ExtensionFilter>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl Listener {
    pub fn new<C: Into<Channel>>(
        role: ListenerRole,
        channel: C,
        filter: Arc<ExtensionFilter>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            id: ListenerId::next(role, channel.into()),
            filter,
            dispatcher,
        }
    }

    pub fn organize<C: Into<Channel>>(
        channel: C,
        filter: Arc<ExtensionFilter>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self::new(ListenerRole::Organize, channel, filter, dispatcher)
    }

    pub fn store_watch<C: Into<Channel>>(
        channel: C,
        filter: Arc<ExtensionFilter>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self::new(ListenerRole::StoreWatch, channel, filter, dispatcher)
    }

    pub fn id(&self) -> &ListenerId {
        &self.id
    }

    pub fn role(&self) -> ListenerRole {
        self.id.role
    }

    pub fn channel(&self) -> &Channel {
        &self.id.channel
    }

    pub fn on_close_write(&self, event: &RawEvent) {
        self.dispatch(RawEventKind::CloseWrite, event);
    }

    pub fn on_moved_to(&self, event: &RawEvent) {
        self.dispatch(RawEventKind::MovedTo, event);
    }

    pub fn on_moved_from(&self, event: &RawEvent) {
        self.dispatch(RawEventKind::MovedFrom, event);
    }

    pub fn on_delete(&self, event: &RawEvent) {
        self.dispatch(RawEventKind::Delete, event);
    }

    /// Translate and publish one raw event, routed by its own kind.
    pub fn handle(&self, event: &RawEvent) -> Outcome {
        self.dispatch(event.kind, event)
    }

    /// The per-kind entry points route on the kind they are named after.
    fn dispatch(&self, kind: RawEventKind, event: &RawEvent) -> Outcome {
        let Some(translate) = self.role().route(kind) else {
            return Outcome::Unhandled;
        };

        let path = match event.path() {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!("{} skipped event: {}", self.id, err);
                return Outcome::Malformed;
            }
        };

        let publish = include_only(&self.filter, |path| self.publish(translate(path)));
        if publish(path) {
            Outcome::Dispatched
        } else {
            Outcome::Filtered
        }
    }

    fn publish(&self, event: DomainEvent) {
        tracing::debug!("{} -> {} {}", self.id, event.name(), event.path().display());
        self.dispatcher.publish(&self.id.channel, event, &self.id);
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        published: Mutex<Vec<(Channel, DomainEvent)>>,
    }

    impl Dispatcher for Recorder {
        fn publish(&self, channel: &Channel, event: DomainEvent, _source: &ListenerId) {
            self.published.lock().unwrap().push((channel.clone(), event));
        }
    }

    fn setup(role: ListenerRole) -> (Listener, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let filter = Arc::new(ExtensionFilter::new(["mp3", "ogg"]));
        let listener = Listener::new(role, "test", filter, recorder.clone());
        (listener, recorder)
    }

    #[test]
    fn test_routing_table() {
        use RawEventKind::*;

        let organize = ListenerRole::Organize;
        let store = ListenerRole::StoreWatch;
        let path = Path::new("/watch/a.mp3");

        assert_eq!(organize.route(CloseWrite).map(|t| t(path)), Some(DomainEvent::organize_file(path)));
        assert_eq!(organize.route(MovedTo).map(|t| t(path)), Some(DomainEvent::organize_file(path)));
        assert!(organize.route(MovedFrom).is_none());
        assert!(organize.route(Delete).is_none());

        assert_eq!(store.route(CloseWrite).map(|t| t(path)), Some(DomainEvent::new_file(path)));
        assert_eq!(store.route(MovedTo).map(|t| t(path)), Some(DomainEvent::new_file(path)));
        assert_eq!(store.route(MovedFrom).map(|t| t(path)), Some(DomainEvent::delete_file(path)));
        assert_eq!(store.route(Delete).map(|t| t(path)), Some(DomainEvent::delete_file(path)));
    }

    #[test]
    fn test_handle_outcomes() {
        let (listener, recorder) = setup(ListenerRole::Organize);

        let supported = RawEvent::new(RawEventKind::CloseWrite, "/watch/a.mp3");
        let unsupported = RawEvent::new(RawEventKind::CloseWrite, "/watch/a.txt");
        let unrouted = RawEvent::new(RawEventKind::Delete, "/watch/a.mp3");
        let malformed = RawEvent::without_path(RawEventKind::MovedTo);

        assert_eq!(listener.handle(&supported), Outcome::Dispatched);
        assert_eq!(listener.handle(&unsupported), Outcome::Filtered);
        assert_eq!(listener.handle(&unrouted), Outcome::Unhandled);
        assert_eq!(listener.handle(&malformed), Outcome::Malformed);

        assert_eq!(recorder.published.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_publishes_on_own_channel() {
        let (listener, recorder) = setup(ListenerRole::StoreWatch);

        listener.on_delete(&RawEvent::new(RawEventKind::Delete, "/watch/a.ogg"));

        let published = recorder.published.lock().unwrap();
        assert_eq!(published[0].0, Channel::from("test"));
        assert_eq!(published[0].1, DomainEvent::delete_file(Path::new("/watch/a.ogg")));
    }

    #[test]
    fn test_malformed_event_does_not_stop_listener() {
        let (listener, recorder) = setup(ListenerRole::StoreWatch);

        listener.on_close_write(&RawEvent::without_path(RawEventKind::CloseWrite));
        listener.on_close_write(&RawEvent::new(RawEventKind::CloseWrite, "/watch/b.mp3"));

        let published = recorder.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1, DomainEvent::new_file(Path::new("/watch/b.mp3")));
    }

    #[test]
    fn test_entry_point_kind_decides_translation() {
        let (store, recorder) = setup(ListenerRole::StoreWatch);

        store.on_delete(&RawEvent::new(RawEventKind::CloseWrite, "/w/a.mp3"));
        store.on_moved_to(&RawEvent::new(RawEventKind::Delete, "/w/b.mp3"));

        assert_eq!(
            *recorder.published.lock().unwrap(),
            vec![
                (Channel::from("test"), DomainEvent::delete_file(Path::new("/w/a.mp3"))),
                (Channel::from("test"), DomainEvent::new_file(Path::new("/w/b.mp3"))),
            ]
        );

        let (organize, recorder) = setup(ListenerRole::Organize);
        organize.on_delete(&RawEvent::new(RawEventKind::CloseWrite, "/w/a.mp3"));
        organize.on_moved_from(&RawEvent::new(RawEventKind::MovedTo, "/w/a.mp3"));
        assert!(recorder.published.lock().unwrap().is_empty());
    }

    #[test]
    fn test_identity() {
        let (listener, _) = setup(ListenerRole::StoreWatch);

        assert_eq!(listener.role(), ListenerRole::StoreWatch);
        assert_eq!(listener.channel().as_str(), "test");
        assert!(listener.id().to_string().starts_with("store-watch#"));
    }
}
