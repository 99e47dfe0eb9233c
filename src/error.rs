//! Error types for tagbridge

use thiserror::Error;

/// Main error type for tagbridge operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid field path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Field not found: '{segment}' in '{path}'")]
    FieldNotFound { path: String, segment: String },

    #[error("Field '{path}' is {found}, expected {expected}")]
    FieldTypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Index {index} out of range for '{path}' ({len} elements)")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("Field '{path}' takes {expected} values, got {got}")]
    ArityMismatch {
        path: String,
        expected: usize,
        got: usize,
    },

    #[error("Tag not found: {0}")]
    DocumentNotFound(String),

    #[error("Tag is already open: {0}")]
    DocumentLocked(String),

    #[error("No schema for tag group '{group}' ({generation})")]
    UnknownTagGroup { group: String, generation: String },

    #[error("Invalid remap table: {0}")]
    InvalidRemapTable(String),
}

impl Error {
    /// True when the error means the schema lacks a field, as opposed to
    /// the document or store being broken.
    pub fn is_schema_miss(&self) -> bool {
        matches!(self, Error::FieldNotFound { .. })
    }
}

/// Result type alias for tagbridge operations
pub type Result<T> = std::result::Result<T, Error>;
