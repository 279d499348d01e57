//! `table-loader` bulk-loads a directory of delimited text files into SQLite, one table per file.
//!
//! The primary entrypoint is [`ingestion::load_directory`]. For each file in the source
//! directory (sorted by name, subdirectories skipped) it:
//!
//! - reads the file as CSV with a header row into a [`types::ParsedTable`]
//! - creates a table named after the file (`stops.txt` becomes `stops`) whose columns are the
//!   header fields, all typed `TEXT`
//! - inserts the rows in batches of [`types::BatchPolicy`] size, binding every cell as a raw
//!   text parameter
//!
//! Any error aborts the run. By default the run is wrapped in a single transaction, so a failed
//! run leaves no partially loaded tables behind.
//!
//! ## Quick example
//!
//! ```no_run
//! use table_loader::ingestion::{load_directory, open_store, LoadOptions};
//! use table_loader::types::BatchPolicy;
//!
//! # fn main() -> Result<(), table_loader::LoadError> {
//! let mut conn = open_store("gtfs.db")?;
//! let opts = LoadOptions {
//!     batch_policy: BatchPolicy::from_size(10_000),
//!     ..Default::default()
//! };
//! let summary = load_directory(&mut conn, "gtfs/", &opts)?;
//! println!("tables={} rows={}", summary.tables.len(), summary.total_rows());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: directory loader and its reader/schema/batch steps
//! - [`types`]: source file, table and batching types
//! - [`error`]: error type used across the crate

pub mod error;
pub mod ingestion;
pub mod types;

pub use error::{LoadError, LoadResult};
