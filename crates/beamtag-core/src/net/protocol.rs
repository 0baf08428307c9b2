//! Event envelope for the client-authority channel.
//!
//! Every line exchanged with the authority is a single event:
//!
//! ```text
//! E(<sender hex>,<timestamp seconds>,<payload>)
//! ```
//!
//! Sender id 0 is reserved for the authority itself. The payload is one
//! message in the wire grammar (see [`crate::net::messages`]); gun-link lines
//! travel raw, without this envelope.

use std::sync::LazyLock;

use regex::Regex;

/// Sender id reserved for the match authority.
pub const AUTHORITY_ID: u32 = 0;

static EVENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^E\(([0-9a-f]+),([0-9.]+),(.*)\)$").expect("event pattern compiles")
});

#[derive(Debug)]
pub enum ProtocolError {
    /// A line on the authority channel that is not a well-formed event.
    MalformedEvent(String),
    /// Asked to build a message kind that has no construction template.
    NotConstructible(&'static str),
    /// Build called with the wrong number of fields.
    WrongArgCount {
        kind: &'static str,
        expected: usize,
        got: usize,
    },
    /// Build called with a field of the wrong type at `index`.
    WrongArgType { kind: &'static str, index: usize },
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedEvent(line) => write!(f, "couldn't parse an event from {line:?}"),
            Self::NotConstructible(kind) => write!(f, "{kind} has no construction template"),
            Self::WrongArgCount { kind, expected, got } => {
                write!(f, "{kind} takes {expected} fields, got {got}")
            },
            Self::WrongArgType { kind, index } => {
                write!(f, "wrong type for field {index} of {kind}")
            },
        }
    }
}

impl std::error::Error for ProtocolError {}

/// One message from a particular sender at a particular time.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub sender_id: u32,
    pub timestamp: f64,
    pub payload: String,
}

impl Event {
    pub fn new(sender_id: u32, timestamp: f64, payload: impl Into<String>) -> Self {
        Self {
            sender_id,
            timestamp,
            payload: payload.into(),
        }
    }

    /// Render the wire form: lowercase hex sender, timestamp with
    /// microsecond precision, payload verbatim.
    pub fn to_wire(&self) -> String {
        format!("E({:x},{:.6},{})", self.sender_id, self.timestamp, self.payload)
    }

    /// Strict envelope decode. Unlike message-kind matching, a line that is
    /// not a well-formed event is an error, not a soft no-match.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let caps = EVENT_PATTERN
            .captures(line)
            .ok_or_else(|| ProtocolError::MalformedEvent(line.to_string()))?;
        let sender_id = u32::from_str_radix(&caps[1], 16)
            .map_err(|_| ProtocolError::MalformedEvent(line.to_string()))?;
        let timestamp: f64 = caps[2]
            .parse()
            .map_err(|_| ProtocolError::MalformedEvent(line.to_string()))?;
        Ok(Self {
            sender_id,
            timestamp,
            payload: caps[3].to_string(),
        })
    }
}
