//! Directory loader.
//!
//! Most callers should use [`load_directory`] (or [`run`] for a path-based configuration), which
//! processes every file in a source directory, sequentially, against one SQLite connection:
//!
//! 1. list the directory (non-recursive, directories skipped, sorted by file name)
//! 2. read each file with a header row
//! 3. create its table with every column typed `TEXT`
//! 4. insert its rows in batches
//!
//! The first error aborts the run. With [`LoadOptions::atomic`] (the default) the run happens
//! inside one transaction, so an aborted run leaves the database as it was.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{LoadError, LoadResult};
use crate::types::{BatchPolicy, DEFAULT_EXTENSION, SourceFile, TableName};

use super::batch::{for_each_batch, insert_batch};
use super::observability::{
    BatchStats, LoadObserver, LoadSeverity, TableContext, TableStats, TracingObserver,
};
use super::reader::read_table;
use super::schema::create_table_statement;

/// Options controlling a load run.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct LoadOptions {
    /// How each file's rows are split into insert batches.
    pub batch_policy: BatchPolicy,
    /// File-type suffix stripped from file names to form table names (without the dot).
    pub extension: String,
    /// Run the whole load inside a single transaction.
    pub atomic: bool,
    /// Observer for progress events. If `None`, events are emitted through `tracing`.
    pub observer: Option<Arc<dyn LoadObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: LoadSeverity,
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("batch_policy", &self.batch_policy)
            .field("extension", &self.extension)
            .field("atomic", &self.atomic)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_policy: BatchPolicy::default(),
            extension: DEFAULT_EXTENSION.to_string(),
            atomic: true,
            observer: None,
            alert_at_or_above: LoadSeverity::Critical,
        }
    }
}

/// Outcome for a single loaded table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableLoad {
    pub table: TableName,
    pub path: PathBuf,
    pub rows: usize,
    pub batches: usize,
}

/// Outcome of a completed run, one entry per source file in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub tables: Vec<TableLoad>,
}

impl LoadSummary {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// List the files to load from `dir`.
///
/// Only direct children are returned; subdirectories are skipped silently. Symlinks are
/// followed, so a link to a directory is skipped too. Entries are sorted by file name.
pub fn scan_source_dir(dir: impl AsRef<Path>) -> LoadResult<Vec<SourceFile>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| LoadError::DirectoryScan {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_dir() {
            debug!(path = %entry.path().display(), "skipping directory");
            continue;
        }
        files.push(SourceFile {
            file_name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path().to_path_buf(),
        });
    }
    Ok(files)
}

/// Open (creating if needed) the SQLite database at `path`.
pub fn open_store(path: impl AsRef<Path>) -> LoadResult<Connection> {
    let path = path.as_ref();
    Connection::open(path).map_err(|e| LoadError::store("opening", path.display().to_string(), e))
}

/// Load every file in `dir` into `conn`.
///
/// When an observer is configured (or the default [`TracingObserver`]), this function reports
/// table creation, each inserted batch and each loaded table, and on error `on_failure` plus
/// `on_alert` when the error's severity is >= `options.alert_at_or_above`.
pub fn load_directory(
    conn: &mut Connection,
    dir: impl AsRef<Path>,
    options: &LoadOptions,
) -> LoadResult<LoadSummary> {
    let dir = dir.as_ref();
    let default_observer = TracingObserver;
    let observer: &dyn LoadObserver = match options.observer.as_deref() {
        Some(o) => o,
        None => &default_observer,
    };

    let mut current = dir.to_path_buf();
    let result = if options.atomic {
        load_in_transaction(conn, dir, options, observer, &mut current)
    } else {
        load_files(conn, dir, options, observer, &mut current)
    };

    if let Err(e) = &result {
        let sev = LoadSeverity::for_error(e);
        observer.on_failure(&current, sev, e);
        if sev >= options.alert_at_or_above {
            observer.on_alert(&current, sev, e);
        }
    }
    result
}

fn load_in_transaction(
    conn: &mut Connection,
    dir: &Path,
    options: &LoadOptions,
    observer: &dyn LoadObserver,
    current: &mut PathBuf,
) -> LoadResult<LoadSummary> {
    let tx = conn
        .transaction()
        .map_err(|e| LoadError::store("starting transaction for", dir.display().to_string(), e))?;
    // Dropping `tx` on the error path rolls back everything created so far.
    let summary = load_files(&tx, dir, options, observer, current)?;
    tx.commit()
        .map_err(|e| LoadError::store("committing transaction for", dir.display().to_string(), e))?;
    Ok(summary)
}

fn load_files(
    conn: &Connection,
    dir: &Path,
    options: &LoadOptions,
    observer: &dyn LoadObserver,
    current: &mut PathBuf,
) -> LoadResult<LoadSummary> {
    let files = scan_source_dir(dir)?;
    info!(dir = %dir.display(), files = files.len(), "scanned source directory");

    let mut summary = LoadSummary::default();
    for file in &files {
        current.clone_from(&file.path);
        summary.tables.push(load_file(conn, file, options, observer)?);
    }
    Ok(summary)
}

/// Load a single source file: read it, create its table, and insert its rows.
pub fn load_file(
    conn: &Connection,
    file: &SourceFile,
    options: &LoadOptions,
    observer: &dyn LoadObserver,
) -> LoadResult<TableLoad> {
    let table = file.table_name(&options.extension);
    let parsed = read_table(&file.path, true)?;

    let create = create_table_statement(&file.path, &table, &parsed.header)?;
    debug!(table = %table, sql = %create, "creating table");
    conn.execute_batch(&create)
        .map_err(|e| LoadError::store("creating table", table.as_str(), e))?;

    let ctx = TableContext {
        path: file.path.clone(),
        table,
    };
    observer.on_table_created(&ctx);

    let column_count = parsed.column_count();
    let batches = for_each_batch(&parsed.rows, options.batch_policy, |index, rows| {
        insert_batch(conn, &ctx.table, column_count, rows)?;
        observer.on_batch_inserted(&ctx, BatchStats { index, rows: rows.len() });
        Ok(())
    })?;

    debug_assert_eq!(batches, options.batch_policy.batch_count(parsed.row_count()));

    let stats = TableStats {
        rows: parsed.row_count(),
        batches,
    };
    observer.on_table_loaded(&ctx, stats);

    Ok(TableLoad {
        table: ctx.table,
        path: ctx.path,
        rows: stats.rows,
        batches: stats.batches,
    })
}

/// Path-based configuration for a complete run.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Directory holding one delimited file per table.
    pub source_dir: PathBuf,
    /// SQLite database file to load into.
    pub db_path: PathBuf,
    /// Load options.
    pub options: LoadOptions,
}

impl LoadConfig {
    /// Check that both paths are set and that the source is a directory.
    pub fn validate(&self) -> LoadResult<()> {
        if self.source_dir.as_os_str().is_empty() || self.db_path.as_os_str().is_empty() {
            return Err(LoadError::Config {
                message: "source and db paths are required".to_string(),
            });
        }
        if !self.source_dir.is_dir() {
            return Err(LoadError::Config {
                message: format!("source '{}' is not a directory", self.source_dir.display()),
            });
        }
        Ok(())
    }
}

/// Validate `config`, open the store, and load the source directory into it.
///
/// The connection is opened once and closed when the run ends.
pub fn run(config: &LoadConfig) -> LoadResult<LoadSummary> {
    config.validate()?;
    let mut conn = open_store(&config.db_path)?;
    let summary = load_directory(&mut conn, &config.source_dir, &config.options)?;
    conn.close()
        .map_err(|(_, e)| LoadError::store("closing", config.db_path.display().to_string(), e))?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    #[test]
    fn scan_skips_directories_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("trips.txt"), "a\n").unwrap();
        fs::write(dir.path().join("agency.txt"), "a\n").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("inner.txt"), "a\n").unwrap();

        let names: Vec<String> = scan_source_dir(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.file_name)
            .collect();
        assert_eq!(names, vec!["agency.txt", "trips.txt"]);
    }

    #[test]
    fn scan_of_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_source_dir(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, LoadError::DirectoryScan { .. }));
    }

    #[test]
    fn config_requires_paths() {
        let cfg = LoadConfig {
            source_dir: PathBuf::new(),
            db_path: PathBuf::from("out.db"),
            options: LoadOptions::default(),
        };
        assert!(matches!(cfg.validate(), Err(LoadError::Config { .. })));
    }

    #[test]
    fn config_rejects_non_directory_source() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let cfg = LoadConfig {
            source_dir: file.path().to_path_buf(),
            db_path: PathBuf::from("out.db"),
            options: LoadOptions::default(),
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
