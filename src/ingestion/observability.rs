//! Load observers and failure severity.
//!
//! [`super::load_directory`] reports table creation, every inserted batch, every loaded table
//! and the failure that ends a run to a [`LoadObserver`]. Failures are graded with
//! [`LoadSeverity::for_error`] and forwarded to `on_alert` at or above the configured threshold.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{error, info, warn};

use crate::error::LoadError;
use crate::types::TableName;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (the run was aborted by bad input).
    Error,
    /// Critical error (I/O or store failures).
    Critical,
}

impl LoadSeverity {
    /// Classify a load error.
    pub fn for_error(e: &LoadError) -> Self {
        match e {
            LoadError::Config { .. } => Self::Error,
            LoadError::DirectoryScan { .. } => Self::Critical,
            LoadError::FileRead { source, .. } => match source.kind() {
                csv::ErrorKind::Io(_) => Self::Critical,
                _ => Self::Error,
            },
            LoadError::InvalidHeader { .. } => Self::Error,
            LoadError::Store { source, .. } => match source {
                // Constraint and SQL errors come from the data; everything else is the store itself.
                rusqlite::Error::SqliteFailure(err, _) if is_data_error(err) => Self::Error,
                // Errors raised while preparing a statement (e.g. an existing table).
                rusqlite::Error::SqlInputError { error, .. } if is_data_error(error) => Self::Error,
                _ => Self::Critical,
            },
            LoadError::RowCountMismatch { .. } => Self::Critical,
        }
    }
}

fn is_data_error(err: &rusqlite::ffi::Error) -> bool {
    matches!(
        err.code,
        rusqlite::ErrorCode::ConstraintViolation | rusqlite::ErrorCode::Unknown
    )
}

/// Context about one table being loaded.
#[derive(Debug, Clone)]
pub struct TableContext {
    /// Source file the table is loaded from.
    pub path: PathBuf,
    /// Destination table.
    pub table: TableName,
}

/// Stats reported after each inserted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    /// Zero-based batch index within the file.
    pub index: usize,
    /// Rows inserted by this batch.
    pub rows: usize,
}

/// Stats reported once a table is fully loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Total rows inserted.
    pub rows: usize,
    /// Number of insert batches executed.
    pub batches: usize,
}

/// Observer interface for load progress and outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait LoadObserver: Send + Sync {
    /// Called after the `CREATE TABLE` statement for a file succeeds.
    fn on_table_created(&self, _ctx: &TableContext) {}

    /// Called after each batch insert succeeds.
    fn on_batch_inserted(&self, _ctx: &TableContext, _stats: BatchStats) {}

    /// Called after every batch of a file has been inserted.
    fn on_table_loaded(&self, _ctx: &TableContext, _stats: TableStats) {}

    /// Called when the run fails. `path` is the file (or directory) being processed.
    fn on_failure(&self, _path: &Path, _severity: LoadSeverity, _error: &LoadError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, path: &Path, severity: LoadSeverity, error: &LoadError) {
        self.on_failure(path, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn LoadObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn LoadObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl LoadObserver for CompositeObserver {
    fn on_table_created(&self, ctx: &TableContext) {
        for o in &self.observers {
            o.on_table_created(ctx);
        }
    }

    fn on_batch_inserted(&self, ctx: &TableContext, stats: BatchStats) {
        for o in &self.observers {
            o.on_batch_inserted(ctx, stats);
        }
    }

    fn on_table_loaded(&self, ctx: &TableContext, stats: TableStats) {
        for o in &self.observers {
            o.on_table_loaded(ctx, stats);
        }
    }

    fn on_failure(&self, path: &Path, severity: LoadSeverity, error: &LoadError) {
        for o in &self.observers {
            o.on_failure(path, severity, error);
        }
    }

    fn on_alert(&self, path: &Path, severity: LoadSeverity, error: &LoadError) {
        for o in &self.observers {
            o.on_alert(path, severity, error);
        }
    }
}

/// Emits load events as `tracing` events. This is the observer used when none is configured.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl LoadObserver for TracingObserver {
    fn on_table_created(&self, ctx: &TableContext) {
        info!(table = %ctx.table, path = %ctx.path.display(), "{} created", ctx.table);
    }

    fn on_batch_inserted(&self, ctx: &TableContext, stats: BatchStats) {
        info!(
            table = %ctx.table,
            batch = stats.index,
            "{} records added to {}",
            stats.rows,
            ctx.table
        );
    }

    fn on_table_loaded(&self, ctx: &TableContext, stats: TableStats) {
        info!(
            table = %ctx.table,
            rows = stats.rows,
            batches = stats.batches,
            "table loaded"
        );
    }

    fn on_failure(&self, path: &Path, severity: LoadSeverity, error: &LoadError) {
        match severity {
            LoadSeverity::Info | LoadSeverity::Warning => {
                warn!(?severity, path = %path.display(), "{error}")
            }
            LoadSeverity::Error | LoadSeverity::Critical => {
                error!(?severity, path = %path.display(), "{error}")
            }
        }
    }

    fn on_alert(&self, path: &Path, severity: LoadSeverity, error: &LoadError) {
        error!(?severity, path = %path.display(), alert = true, "{error}");
    }
}

/// Appends load events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl LoadObserver for FileObserver {
    fn on_table_created(&self, ctx: &TableContext) {
        self.append_line(&format!(
            "{} created table={} path={}",
            unix_ts(),
            ctx.table,
            ctx.path.display()
        ));
    }

    fn on_batch_inserted(&self, ctx: &TableContext, stats: BatchStats) {
        self.append_line(&format!(
            "{} batch table={} index={} rows={}",
            unix_ts(),
            ctx.table,
            stats.index,
            stats.rows
        ));
    }

    fn on_table_loaded(&self, ctx: &TableContext, stats: TableStats) {
        self.append_line(&format!(
            "{} ok table={} rows={} batches={}",
            unix_ts(),
            ctx.table,
            stats.rows,
            stats.batches
        ));
    }

    fn on_failure(&self, path: &Path, severity: LoadSeverity, error: &LoadError) {
        self.append_line(&format!(
            "{} fail severity={:?} path={} err={}",
            unix_ts(),
            severity,
            path.display(),
            error
        ));
    }

    fn on_alert(&self, path: &Path, severity: LoadSeverity, error: &LoadError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} path={} err={}",
            unix_ts(),
            severity,
            path.display(),
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
