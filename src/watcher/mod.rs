//! Event log watchers
//!
//! A watcher subscribes to a named log and delivers new events and delivery
//! errors over two independent channels. The Windows backend uses the Event
//! Log subscription API; other platforms report that subscriptions are not
//! supported, which the ingestion loop treats as a failure to start.

use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::event::Event;

#[cfg(windows)]
mod windows;

#[cfg(not(windows))]
mod unsupported;

#[cfg(windows)]
pub use self::windows::create;

#[cfg(not(windows))]
pub use self::unsupported::create;

/// Query matching every event on a log
pub const ALL_EVENTS: &str = "*";

#[derive(Debug, Error)]
#[cfg_attr(not(windows), allow(dead_code))]
pub enum WatchError {
    #[error("Couldn't create watcher: {0}")]
    Create(String),

    #[error("Couldn't create watcher: event log subscriptions are not supported on {0}")]
    Unsupported(&'static str),

    #[error("Couldn't subscribe to '{log_name}': {reason}")]
    Subscribe { log_name: String, reason: String },

    #[error("{0}")]
    Delivery(String),

    #[error("Couldn't release subscription: {0}")]
    Release(String),
}

/// Receiving ends of a live subscription
#[derive(Debug)]
pub struct EventStreams {
    pub events: UnboundedReceiver<Event>,
    pub errors: UnboundedReceiver<WatchError>,
}

/// A handle onto an event log subscription
pub trait Watcher: Send {
    /// Subscribe to events logged to `log_name` from now on. Past events are not replayed.
    fn subscribe_from_now(&mut self, log_name: &str, query: &str) -> Result<EventStreams, WatchError>;

    /// Release the subscription and every OS resource held for it.
    ///
    /// Callers invoke this at most once; it must also be safe before any subscription exists.
    fn shutdown(&mut self) -> Result<(), WatchError>;
}
