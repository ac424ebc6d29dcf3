//! Event line formatting
//!
//! Two line styles are supported, both space-joined with no escaping of
//! spaces inside fields:
//!
//! - `simple`:  `<timestamp> [<severity>] <provider> <message>`
//! - `rfc5424`: `<34>1 <timestamp> [<severity>] <computer> <provider> <pid> <event-id> <message>`
//!
//! The message is always passed through the configured [`MessagePolicy`] first.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::FormattingConfig;
use crate::event::Event;
use crate::normalize::MessagePolicy;
use crate::severity::{Severity, classify};

/// Syslog PRI (facility 4, severity 2) and version that open every RFC 5424 line
const RFC5424_HEADER: &str = "<34>1";

/// Output line style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Simple,
    Rfc5424,
}

impl LineStyle {
    /// Parse a style name, case-insensitively. Unrecognized names yield `simple`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "simple" => Self::Simple,
            "rfc5424" => Self::Rfc5424,
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Rfc5424 => "rfc5424",
        }
    }
}

impl fmt::Display for LineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render one event as a single output line. Never fails.
pub fn format_event(event: &Event, style: LineStyle, policy: MessagePolicy, use_color: bool) -> String {
    match style {
        LineStyle::Simple => to_simple(event, policy, use_color),
        LineStyle::Rfc5424 => to_rfc5424(event, policy),
    }
}

/// Render one event with the process-wide formatting settings
pub fn format_with(event: &Event, config: &FormattingConfig) -> String {
    format_event(event, config.style, config.policy, config.use_color)
}

fn to_simple(event: &Event, policy: MessagePolicy, use_color: bool) -> String {
    let severity = classify(event.level);
    let level = if use_color {
        severity.paint(&bracketed(severity))
    } else {
        bracketed(severity)
    };

    [
        timestamp(event),
        level,
        event.provider_name.clone(),
        policy.apply(&event.message).into_owned(),
    ]
    .join(" ")
}

fn to_rfc5424(event: &Event, policy: MessagePolicy) -> String {
    [
        RFC5424_HEADER.to_string(),
        timestamp(event),
        bracketed(classify(event.level)),
        event.computer_name.clone(),
        event.provider_name.clone(),
        event.process_id.to_string(),
        event.event_id.to_string(),
        policy.apply(&event.message).into_owned(),
    ]
    .join(" ")
}

fn bracketed(severity: Severity) -> String {
    format!("[{}]", severity.name())
}

fn timestamp(event: &Event) -> String {
    event.created.to_rfc3339_opts(SecondsFormat::Secs, true)
}
