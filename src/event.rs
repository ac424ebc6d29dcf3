//! A single record delivered by an event log subscription

use chrono::{DateTime, Utc};

/// One event as delivered by a watcher.
///
/// Events are never mutated after delivery; formatting only derives strings from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// When the event was created (UTC)
    pub created: DateTime<Utc>,
    /// Source-defined severity code, see [`crate::severity::classify`]
    pub level: i32,
    /// Component that emitted the event
    pub provider_name: String,
    /// Host the event was logged on
    pub computer_name: String,
    pub process_id: u32,
    pub event_id: u32,
    /// Rendered message; may be empty or span several lines
    pub message: String,
}
