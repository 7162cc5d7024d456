//! Error types for bibkeep core operations.
//!
//! This module defines well-structured error types using `thiserror` for
//! library-level errors, while the CLI uses `anyhow` for convenient error
//! handling at the top level.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using BibError
pub type Result<T> = std::result::Result<T, BibError>;

/// Core error types for bibkeep operations.
#[derive(Error, Debug)]
pub enum BibError {
    // === Store Errors ===
    /// A label required to be present is not in the store
    #[error("no entry with label '{label}'")]
    NotFound { label: String },

    /// The backing database file does not exist
    #[error("database file {path} does not exist, run `bibkeep init` first")]
    DatabaseMissing { path: PathBuf },

    /// The database file is not properly framed
    #[error("malformed database at line {line}: {reason}")]
    MalformedDatabase { line: usize, reason: String },

    /// A label that cannot be written as a record anchor
    #[error("invalid label '{label}': {reason}")]
    InvalidLabel { label: String, reason: String },

    // === Entry Errors ===
    /// An author string with too many commas
    #[error("expected at most 2 commas in author '{author}', found {commas}")]
    MalformedAuthor { author: String, commas: usize },

    // === Search Errors ===
    /// Invalid search or filter pattern (e.g., bad regex)
    #[error("invalid search pattern: {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The external full-text search tool could not be run
    #[error("external search tool '{program}' failed: {reason}")]
    ExternalTool { program: String, reason: String },

    // === Configuration Errors ===
    /// Configuration file parsing or validation failed
    #[error("configuration error: {reason}")]
    Config { reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// YAML could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The parse cache is unusable
    #[error("cache error: {0}")]
    Cache(String),
}

impl BibError {
    /// Returns true if the process should not carry on with an empty or
    /// partially written database after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BibError::DatabaseMissing { .. } | BibError::MalformedDatabase { .. } | BibError::Io(_)
        )
    }

    /// Create a not-found error
    pub fn not_found(label: impl Into<String>) -> Self {
        BibError::NotFound {
            label: label.into(),
        }
    }

    /// Create a malformed-database error
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        BibError::MalformedDatabase {
            line,
            reason: reason.into(),
        }
    }

    /// Create a cache error
    pub fn cache(reason: impl Into<String>) -> Self {
        BibError::Cache(reason.into())
    }
}

impl From<bincode::Error> for BibError {
    fn from(err: bincode::Error) -> Self {
        BibError::Cache(err.to_string())
    }
}
