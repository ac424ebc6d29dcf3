//! Message normalization policies

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// How a possibly multi-line message is collapsed for display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagePolicy {
    /// Message unchanged, line breaks preserved
    Full,
    /// Every `\r` and `\n` replaced by one space
    #[default]
    SingleLine,
    /// Only the first line is kept
    SingleLineTrim,
}

impl MessagePolicy {
    /// Parse a policy name, case-insensitively. Unrecognized names yield the default.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "full" => Self::Full,
            "singleline" => Self::SingleLine,
            "singlelinetrim" => Self::SingleLineTrim,
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::SingleLine => "singleline",
            Self::SingleLineTrim => "singlelinetrim",
        }
    }

    pub fn apply<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        normalize(raw, *self)
    }
}

impl fmt::Display for MessagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collapse `raw` according to `policy`
pub fn normalize(raw: &str, policy: MessagePolicy) -> Cow<'_, str> {
    match policy {
        MessagePolicy::Full => Cow::Borrowed(raw),
        MessagePolicy::SingleLine => {
            if raw.contains(['\r', '\n']) {
                Cow::Owned(raw.replace(['\r', '\n'], " "))
            } else {
                Cow::Borrowed(raw)
            }
        }
        MessagePolicy::SingleLineTrim => Cow::Owned(first_line(raw)),
    }
}

// A bare `\r` ahead of the first `\r\n` (or anywhere, when there is no `\r\n`) is
// dropped once before splitting.
fn first_line(raw: &str) -> String {
    let crlf = raw.find("\r\n");
    let stripped = match raw.find('\r') {
        Some(cr) if crlf != Some(cr) => {
            let mut s = String::with_capacity(raw.len());
            s.push_str(&raw[..cr]);
            s.push_str(&raw[cr + 1..]);
            s
        }
        _ => raw.to_string(),
    };

    match stripped.split_once("\r\n") {
        Some((head, _)) => head.to_string(),
        None => stripped,
    }
}
