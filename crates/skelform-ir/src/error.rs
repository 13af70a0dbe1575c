//! Error types for snapshot encodings.

use thiserror::Error;

/// Errors from reading or writing snapshot text.
#[derive(Error, Debug)]
pub enum XmlError {
    /// Malformed XML.
    #[error("XML parse error at byte {position}: {message}")]
    Parse {
        /// Byte offset the reader had reached.
        position: u64,
        /// Reader's description of the problem.
        message: String,
    },

    /// Document root is not `<snapshot>`.
    #[error("unexpected root element <{0}>, expected <snapshot>")]
    UnexpectedRoot(String),

    /// Input contained no root element at all.
    #[error("no <snapshot> element found")]
    MissingRoot,

    /// Writer failure.
    #[error("XML write error: {0}")]
    Write(String),

    /// Generated bytes were not UTF-8.
    #[error("invalid UTF-8 in generated XML: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// JSON encoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for snapshot encodings.
pub type Result<T> = std::result::Result<T, XmlError>;
