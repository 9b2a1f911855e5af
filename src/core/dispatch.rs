//! Publishing domain events to subscribers
//!
//! Listeners publish through the [`Dispatcher`] trait they are handed at
//! construction. [`EventBus`] is the in-process implementation: subscribers
//! register per channel and receive [`Envelope`]s over `mpsc` channels.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use serde::{Deserialize, Serialize};
use super::events::DomainEvent;
use super::listener::ListenerRole;

/// Name of a broadcast group, fixed per listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Channel(String);

impl Channel {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Channel {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Channel {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies the listener a publication came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId {
    pub role: ListenerRole,
    pub channel: Channel,
    pub instance: u64,
}

impl ListenerId {
    pub(crate) fn next(role: ListenerRole, channel: Channel) -> Self {
        Self {
            role,
            channel,
            instance: NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.role, self.instance, self.channel)
    }
}

/// A publication as seen by a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub channel: Channel,
    pub source: ListenerId,
    pub event: DomainEvent,
}

/// Delivers domain events to whoever subscribed to a channel.
///
/// Publication is fire and forget: implementations must not block the caller
/// and report nothing back.
pub trait Dispatcher: Send + Sync {
    fn publish(&self, channel: &Channel, event: DomainEvent, source: &ListenerId);
}

#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<HashMap<Channel, Vec<Sender<Envelope>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<C: Into<Channel>>(&self, channel: C) -> Receiver<Envelope> {
        let (tx, rx) = mpsc::channel();
        let channel = channel.into();
        tracing::debug!("New subscriber on channel '{}'", channel);
        self.lock().entry(channel).or_default().push(tx);
        rx
    }

    pub fn subscriber_count(&self, channel: &Channel) -> usize {
        self.lock().get(channel).map_or(0, Vec::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Channel, Vec<Sender<Envelope>>>> {
        self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Dispatcher for EventBus {
    fn publish(&self, channel: &Channel, event: DomainEvent, source: &ListenerId) {
        let mut subscribers = self.lock();
        let Some(senders) = subscribers.get_mut(channel) else {
            tracing::trace!("No subscribers on channel '{}'", channel);
            return;
        };

        let envelope = Envelope {
            channel: channel.clone(),
            source: source.clone(),
            event,
        };
        senders.retain(|tx| tx.send(envelope.clone()).is_ok());
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self.lock();
        let mut map = f.debug_map();
        for (channel, senders) in subscribers.iter() {
            map.entry(&channel.as_str(), &senders.len());
        }
        map.finish()
    }
}
