use crate::{RunState, SegmentField};

/// Result alias that carries the custom [`MetronomeError`] type.
pub type Result<T> = std::result::Result<T, MetronomeError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum MetronomeError {
    /// Free-form message for failures that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration or snapshot (de)serialisation failure.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Segment edits are only accepted while stopped or finished.
    #[error("segments cannot be edited while the metronome is {state}")]
    EditLocked { state: RunState },
    /// A segment field received a value outside `(0, field.max_value()]`.
    #[error(
        "invalid {field} value {value}: expected a positive number up to {}",
        .field.max_value()
    )]
    InvalidSegment { field: SegmentField, value: f64 },
    /// The timeline must always keep at least one segment.
    #[error("the timeline must contain at least one segment")]
    EmptyTimeline,
    /// Textual input (segments, fields, commands) could not be parsed.
    #[error("could not parse {input:?}: {reason}")]
    Parse { input: String, reason: &'static str },
}

impl MetronomeError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn parse(input: impl Into<String>, reason: &'static str) -> Self {
        Self::Parse {
            input: input.into(),
            reason,
        }
    }
}

impl From<&str> for MetronomeError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for MetronomeError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
