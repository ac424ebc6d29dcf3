//! Severity classification
//!
//! Maps the numeric level carried by an event to a named level and an
//! optional display accent. The mapping follows the standard event log levels:
//!
//! | code | level       | accent  |
//! |------|-------------|---------|
//! | 1    | Critical    | magenta |
//! | 2    | Error       | red     |
//! | 3    | Warning     | yellow  |
//! | 4    | Information | green   |
//! | 5    | Verbose     | cyan    |
//!
//! Every other code, including 0 and negative values, is `Unknown`.

use colored::Color;
use std::fmt;

// `colored` can only force color process-wide (`control::set_override`), so the
// escape is built here and `use_color` stays a per-config value
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Information,
    Verbose,
    Unknown,
}

/// Classify a severity code. Never fails.
pub fn classify(level: i32) -> Severity {
    match level {
        1 => Severity::Critical,
        2 => Severity::Error,
        3 => Severity::Warning,
        4 => Severity::Information,
        5 => Severity::Verbose,
        _ => Severity::Unknown,
    }
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Information => "Information",
            Severity::Verbose => "Verbose",
            Severity::Unknown => "Unknown",
        }
    }

    /// Display accent, if this level has one
    pub fn color(&self) -> Option<Color> {
        match self {
            Severity::Critical => Some(Color::Magenta),
            Severity::Error => Some(Color::Red),
            Severity::Warning => Some(Color::Yellow),
            Severity::Information => Some(Color::Green),
            Severity::Verbose => Some(Color::Cyan),
            Severity::Unknown => None,
        }
    }

    /// Wrap `text` in this level's accent escape and a reset.
    ///
    /// Ignores `colored`'s tty detection; callers decide whether to paint.
    pub fn paint(&self, text: &str) -> String {
        match self.color() {
            Some(color) => format!("\x1b[{}m{}{}", color.to_fg_str(), text, RESET),
            None => text.to_string(),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
