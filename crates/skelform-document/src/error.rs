//! Error types for document I/O.

use std::path::PathBuf;

use skelform_ir::XmlError;
use thiserror::Error;

/// Errors from loading or saving document text and configuration.
///
/// Editing operations never fail; they ignore requests that do not apply.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Snapshot XML could not be read or written.
    #[error(transparent)]
    Xml(#[from] XmlError),

    /// Snapshot JSON could not be read or written.
    ///
    /// [`Snapshot::to_json`](skelform_ir::Snapshot::to_json) and
    /// [`Snapshot::from_json`](skelform_ir::Snapshot::from_json) hand back
    /// `serde_json` errors directly, so they are wrapped here as is.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration text is not valid TOML for [`DocumentConfig`](crate::DocumentConfig).
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Result type for document I/O.
pub type Result<T> = std::result::Result<T, DocumentError>;
