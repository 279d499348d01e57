//! Core data model types for loading.
//!
//! A run discovers [`SourceFile`]s, parses each into a [`ParsedTable`], and stores its rows under
//! a [`TableName`] derived from the file name. Rows are split according to a [`BatchPolicy`].

use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::Serialize;

/// Default number of rows per insert batch.
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

/// Default file-type suffix stripped from source file names.
pub const DEFAULT_EXTENSION: &str = "txt";

/// A non-directory entry found while scanning the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File name within the source directory (e.g. `stops.txt`).
    pub file_name: String,
    /// Full path to the file.
    pub path: PathBuf,
}

impl SourceFile {
    /// Table name for this file, stripping `.{extension}` when present.
    pub fn table_name(&self, extension: &str) -> TableName {
        TableName::from_file_name(&self.file_name, extension)
    }
}

/// Destination table name, derived deterministically from a source file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TableName(String);

impl TableName {
    /// Wrap an already-derived table name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Derive a table name from a file name.
    ///
    /// Only a trailing `.{extension}` is stripped: `stops.txt` becomes `stops`, while
    /// `stops.csv` (with extension `txt`) is used as-is. An empty extension disables stripping.
    pub fn from_file_name(file_name: &str, extension: &str) -> Self {
        let ext = extension.trim_start_matches('.');
        if ext.is_empty() {
            return Self::new(file_name);
        }
        let stripped = file_name
            .strip_suffix(ext)
            .and_then(|rest| rest.strip_suffix('.'))
            .filter(|base| !base.is_empty());
        Self::new(stripped.unwrap_or(file_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name as a double-quoted SQL identifier.
    pub fn quoted(&self) -> String {
        quote_ident(&self.0)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render `name` as a double-quoted SQL identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// In-memory contents of one delimited file.
///
/// Every cell is kept as raw text. When parsed with a header, every row has exactly
/// `header.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    /// Column names, in file order. Empty when the file was read without a header.
    pub header: Vec<String>,
    /// Data rows, in file order.
    pub rows: Vec<Vec<String>>,
}

impl ParsedTable {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }
}

/// How rows of one file are split into insert batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Contiguous batches of at most this many rows.
    Chunked(NonZeroUsize),
    /// A single batch holding every row of the file.
    Whole,
}

impl BatchPolicy {
    /// Map a signed batch size to a policy. Zero and negative sizes disable batching.
    pub fn from_size(size: i64) -> Self {
        usize::try_from(size)
            .ok()
            .and_then(NonZeroUsize::new)
            .map_or(Self::Whole, Self::Chunked)
    }

    /// Number of batches needed for `rows` rows under this policy.
    pub fn batch_count(&self, rows: usize) -> usize {
        match self {
            _ if rows == 0 => 0,
            Self::Chunked(size) => rows.div_ceil(size.get()),
            Self::Whole => 1,
        }
    }
}

impl Default for BatchPolicy {
    fn default() -> Self {
        match NonZeroUsize::new(DEFAULT_BATCH_SIZE) {
            Some(size) => Self::Chunked(size),
            None => Self::Whole,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_name_strips_trailing_extension_only() {
        assert_eq!(TableName::from_file_name("stops.txt", "txt").as_str(), "stops");
        assert_eq!(TableName::from_file_name("stops.txt", ".txt").as_str(), "stops");
        assert_eq!(TableName::from_file_name("stops.csv", "txt").as_str(), "stops.csv");
        assert_eq!(TableName::from_file_name("a.txt.bak", "txt").as_str(), "a.txt.bak");
        assert_eq!(TableName::from_file_name("stopstxt", "txt").as_str(), "stopstxt");
        assert_eq!(TableName::from_file_name(".txt", "txt").as_str(), ".txt");
        assert_eq!(TableName::from_file_name("stops.txt", "").as_str(), "stops.txt");
    }

    #[test]
    fn quoted_identifiers_double_embedded_quotes() {
        assert_eq!(TableName::new("routes").quoted(), "\"routes\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn batch_policy_from_size() {
        assert_eq!(BatchPolicy::from_size(0), BatchPolicy::Whole);
        assert_eq!(BatchPolicy::from_size(-5), BatchPolicy::Whole);
        assert_eq!(
            BatchPolicy::from_size(3),
            BatchPolicy::Chunked(NonZeroUsize::new(3).unwrap())
        );
        assert_eq!(
            BatchPolicy::default(),
            BatchPolicy::Chunked(NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap())
        );
    }

    #[test]
    fn batch_count_is_ceiling_division() {
        let p = BatchPolicy::from_size(3);
        assert_eq!(p.batch_count(0), 0);
        assert_eq!(p.batch_count(1), 1);
        assert_eq!(p.batch_count(3), 1);
        assert_eq!(p.batch_count(7), 3);
        assert_eq!(BatchPolicy::Whole.batch_count(0), 0);
        assert_eq!(BatchPolicy::Whole.batch_count(10), 1);
    }
}
