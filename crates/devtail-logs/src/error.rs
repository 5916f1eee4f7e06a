//! Error types for parsing, filter construction, and streaming

/// Failure while turning a raw chunk into entries.
///
/// Both variants are recoverable at the stream level: the offending chunk is
/// dropped and streaming continues.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The source delivered an empty chunk.
    #[error("empty log chunk")]
    EmptyChunk,

    /// A split message group no longer starts with a timestamp. The split
    /// stage guarantees it does, so this indicates a parser bug.
    #[error("timestamp missing from message group: {0:?}")]
    MissingTimestamp(String),
}

/// Failure while building a filter, surfaced before any streaming begins.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// A custom pattern was malformed or named an unknown priority.
    #[error("invalid filter pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A match pattern failed to compile.
    #[error("invalid match regex: {0}")]
    Regex(#[from] regex::Error),
}

/// Error emitted on the session event channel.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// One chunk failed to parse; the stream keeps going.
    #[error("failed to parse log chunk: {0}")]
    Parse(#[from] ParseError),

    /// Non-fatal noise from the source process (stderr chatter, read
    /// hiccups); the stream keeps going.
    #[error("log source reported: {0}")]
    Source(String),

    /// The source cannot stream at all (e.g. no simulator is booted); the
    /// session terminates after emitting this.
    #[error("log source failed: {0}")]
    SourceFatal(String),
}

impl StreamError {
    /// Whether the session terminates after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SourceFatal(_))
    }
}
