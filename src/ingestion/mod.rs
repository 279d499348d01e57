//! Loading entrypoints and implementations.
//!
//! Most callers should use [`load_directory`] or [`run`] (from [`loader`]) which:
//!
//! - lists a source directory, one file per table
//! - creates each table from the file's header row, every column typed `TEXT`
//! - inserts the rows in batches with parameterized statements
//! - reports progress, failures, and alerts to a [`LoadObserver`]
//!
//! The individual steps are also available under:
//! - [`reader`]
//! - [`schema`]
//! - [`batch`]

pub mod batch;
pub mod loader;
pub mod observability;
pub mod reader;
pub mod schema;

pub use loader::{
    LoadConfig, LoadOptions, LoadSummary, TableLoad, load_directory, load_file, open_store, run,
    scan_source_dir,
};
pub use observability::{
    BatchStats, CompositeObserver, FileObserver, LoadObserver, LoadSeverity, TableContext, TableStats,
    TracingObserver,
};
pub use reader::read_table;
