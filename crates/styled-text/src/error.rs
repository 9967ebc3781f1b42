use crate::run_array::RunArrayError;
use crate::undo::UndoState;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced by [`StyledText`](crate::StyledText) operations.
///
/// Every operation validates its arguments before mutating anything, so an `Err` always
/// leaves the buffer unchanged.
pub enum TextError {
    #[error("text contains {count} illegal control characters")]
    /// Inserted text contained control characters and the policy is to reject them.
    IllegalCharacters {
        /// Number of offending characters.
        count: usize,
    },

    #[error("character index {index} out of range (text has {len} characters)")]
    /// A position lay beyond the end of the text.
    IndexOutOfRange {
        /// Offending character index.
        index: usize,
        /// Character count of the text.
        len: usize,
    },

    #[error("invalid text range {start}..{end} (text has {len} characters)")]
    /// A range was reversed, extended past the end, or disagreed with its byte span.
    InvalidRange {
        /// Range start (characters).
        start: usize,
        /// Range end (characters).
        end: usize,
        /// Character count of the text.
        len: usize,
    },

    #[error("style runs cover {styles} characters but the text has {chars}")]
    /// A style run list did not match the length of its text.
    StyleLength {
        /// Elements in the style runs.
        styles: usize,
        /// Characters in the text.
        chars: usize,
    },

    #[error("invalid search pattern: {0}")]
    /// A search or reflow pattern failed to compile.
    InvalidPattern(#[from] regex::Error),

    #[error("match at {start}..{end} no longer matches the text")]
    /// A match passed to `replace_match` is stale.
    StaleMatch {
        /// Match start (bytes).
        start: usize,
        /// Match end (bytes).
        end: usize,
    },

    #[error(transparent)]
    /// A style run operation was out of range.
    Runs(#[from] RunArrayError),

    #[error(transparent)]
    /// The undo history refused the edit.
    Undo(#[from] UndoError),

    #[error(transparent)]
    /// Persisted data could not be read or written.
    Persist(#[from] PersistError),

    #[error("I/O error: {0}")]
    /// Reading or writing a stream failed.
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by [`UndoRedoChain`](crate::UndoRedoChain).
pub enum UndoError {
    #[error("edit attempted while the history is {0:?}")]
    /// A command was recorded, or an undo/redo started, while another undo/redo was being
    /// applied.
    Reentrant(UndoState),

    #[error("no undo or redo is being applied")]
    /// `finish` was called without a matching `begin_undo`/`begin_redo`.
    NotApplying,
}

#[derive(Debug, Error)]
/// Errors produced when reading or writing the private serialization format.
pub enum PersistError {
    #[error("unsupported format version {found} (newest supported is {supported})")]
    /// The stream was written by a newer version of the format.
    UnsupportedVersion {
        /// Version found in the stream.
        found: u32,
        /// Newest version this build can read.
        supported: u32,
    },

    #[error("corrupt data: {0}")]
    /// The stream does not follow the format.
    Corrupt(String),

    #[error("style run JSON error: {0}")]
    /// The style run list failed to parse or serialize.
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    /// Reading or writing the stream failed.
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
/// Errors produced when loading a [`TextConfig`](crate::TextConfig).
pub enum ConfigError {
    #[error("config parse error: {0}")]
    /// The configuration was not valid JSON for the expected shape.
    Json(#[from] serde_json::Error),

    #[error("reflow rule {index} has an invalid pattern: {source}")]
    /// A reflow rule pattern failed to compile.
    InvalidRule {
        /// Position of the rule in the configured list.
        index: usize,
        /// The compiler error.
        source: regex::Error,
    },
}
