use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for loader operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Error type returned by loader functions.
///
/// Every variant is fatal for the run that produced it; callers decide how to surface it.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Invalid or missing configuration (e.g. an empty source or database path).
    #[error("configuration error: {message}")]
    Config { message: String },

    /// The source directory could not be listed.
    #[error("failed to scan directory '{}': {source}", .path.display())]
    DirectoryScan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// A source file could not be opened or parsed (including field-count mismatches).
    #[error("failed to read '{}': {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The header row cannot be turned into a table definition.
    #[error("invalid header in '{}': {message}", .path.display())]
    InvalidHeader { path: PathBuf, message: String },

    /// A statement against the destination store failed.
    #[error("store error while {action} '{table}': {source}")]
    Store {
        action: &'static str,
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    /// An insert reported a different number of changed rows than it was given.
    #[error("insert into '{table}' changed {actual} rows, expected {expected}")]
    RowCountMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },
}

impl LoadError {
    pub(crate) fn store(action: &'static str, table: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Store {
            action,
            table: table.into(),
            source,
        }
    }
}
