use std::fmt;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Low-level filesystem notifications the listeners understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawEventKind {
    /// A file opened for writing was closed
    CloseWrite,
    /// A file was moved into the watched directory
    MovedTo,
    /// A file was moved out of the watched directory
    MovedFrom,
    /// A file was deleted from the watched directory
    Delete,
}

impl RawEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RawEventKind::CloseWrite => "CLOSE_WRITE",
            RawEventKind::MovedTo => "MOVED_TO",
            RawEventKind::MovedFrom => "MOVED_FROM",
            RawEventKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RawEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single notification as delivered by the watch facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: RawEventKind,
    path: Option<PathBuf>,
}

impl RawEvent {
    pub fn new<P: Into<PathBuf>>(kind: RawEventKind, path: P) -> Self {
        Self {
            kind,
            path: Some(path.into()),
        }
    }

    /// A notification the facility delivered without any path attached.
    pub fn without_path(kind: RawEventKind) -> Self {
        Self { kind, path: None }
    }

    /// The path the event refers to. Missing and empty paths are malformed.
    pub fn path(&self) -> Result<&Path, EventError> {
        match self.path.as_deref() {
            Some(path) if !path.as_os_str().is_empty() => Ok(path),
            _ => Err(EventError::missing_path(self.kind)),
        }
    }
}

/// Application-level outcome of a filesystem change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    NewFile { path: PathBuf },
    DeleteFile { path: PathBuf },
    OrganizeFile { path: PathBuf },
}

impl DomainEvent {
    pub fn new_file(path: &Path) -> Self {
        DomainEvent::NewFile { path: path.to_path_buf() }
    }

    pub fn delete_file(path: &Path) -> Self {
        DomainEvent::DeleteFile { path: path.to_path_buf() }
    }

    pub fn organize_file(path: &Path) -> Self {
        DomainEvent::OrganizeFile { path: path.to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        match self {
            DomainEvent::NewFile { path }
            | DomainEvent::DeleteFile { path }
            | DomainEvent::OrganizeFile { path } => path,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::NewFile { .. } => "NEW",
            DomainEvent::DeleteFile { .. } => "DELETE",
            DomainEvent::OrganizeFile { .. } => "ORGANIZE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("malformed {kind} event: {reason}")]
    MalformedRawEvent {
        kind: RawEventKind,
        reason: &'static str,
    },
}

impl EventError {
    pub fn missing_path(kind: RawEventKind) -> Self {
        EventError::MalformedRawEvent {
            kind,
            reason: "missing path",
        }
    }
}
