//! Core functionality module
//!
//! Contains extension filtering, raw-to-domain event translation, listener
//! dispatch and the notify-backed watch facility

pub mod events;
pub mod filter;
pub mod listener;
pub mod dispatch;
pub mod watcher;

// Re-export main types
pub use events::{DomainEvent, EventError, RawEvent, RawEventKind};
pub use filter::{include_only, ExtensionFilter};
pub use listener::{Listener, ListenerRole, Outcome, Translator};
pub use dispatch::{Channel, Dispatcher, Envelope, EventBus, ListenerId};
pub use watcher::FileMonitor;
