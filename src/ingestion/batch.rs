//! Batched row insertion.
//!
//! Rows are split into contiguous batches by [`partition`]. Each batch is inserted by
//! [`insert_batch`] with one prepared statement whose placeholders are bound to the raw cell
//! values, so cell contents never become part of the SQL text.

use rusqlite::{Connection, params_from_iter};
use tracing::debug;

use crate::error::{LoadError, LoadResult};
use crate::types::{BatchPolicy, TableName};

use super::schema::insert_statement;

const SAVEPOINT: &str = "table_loader_batch";

/// Split `rows` into batches according to `policy`.
///
/// Batches are contiguous, disjoint, in row order, and together cover every row. Only the last
/// batch may be smaller than the configured size. Zero rows produce zero batches.
pub fn partition<T>(rows: &[T], policy: BatchPolicy) -> Box<dyn Iterator<Item = &[T]> + '_> {
    match policy {
        _ if rows.is_empty() => Box::new(std::iter::empty()),
        BatchPolicy::Chunked(size) => Box::new(rows.chunks(size.get())),
        BatchPolicy::Whole => Box::new(std::iter::once(rows)),
    }
}

/// Run `task` once per batch of `rows`, in order, stopping at the first error.
///
/// Returns the number of batches processed.
pub fn for_each_batch<T, F>(rows: &[T], policy: BatchPolicy, mut task: F) -> LoadResult<usize>
where
    F: FnMut(usize, &[T]) -> LoadResult<()>,
{
    let mut count = 0;
    for (index, batch) in partition(rows, policy).enumerate() {
        task(index, batch)?;
        count += 1;
    }
    Ok(count)
}

/// Insert one batch of rows into `table`.
///
/// Every row must have `column_count` cells. The batch is applied inside a savepoint: either
/// all of its rows are stored or, on error, none are. Each row's changed-row count is checked.
pub fn insert_batch(
    conn: &Connection,
    table: &TableName,
    column_count: usize,
    rows: &[Vec<String>],
) -> LoadResult<()> {
    if rows.is_empty() {
        return Ok(());
    }

    conn.execute_batch(&format!("SAVEPOINT {SAVEPOINT};"))
        .map_err(|e| LoadError::store("opening batch for", table.as_str(), e))?;

    match insert_rows(conn, table, column_count, rows) {
        Ok(()) => conn
            .execute_batch(&format!("RELEASE {SAVEPOINT};"))
            .map_err(|e| LoadError::store("committing batch for", table.as_str(), e)),
        Err(err) => {
            // The original error is what matters; a failed rollback is only logged.
            if let Err(rollback) =
                conn.execute_batch(&format!("ROLLBACK TO {SAVEPOINT}; RELEASE {SAVEPOINT};"))
            {
                debug!(table = %table, error = %rollback, "batch rollback failed");
            }
            Err(err)
        }
    }
}

fn insert_rows(
    conn: &Connection,
    table: &TableName,
    column_count: usize,
    rows: &[Vec<String>],
) -> LoadResult<()> {
    let sql = insert_statement(table, column_count);
    debug!(table = %table, rows = rows.len(), %sql, "inserting batch");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| LoadError::store("preparing insert into", table.as_str(), e))?;

    for row in rows {
        let changed = stmt
            .execute(params_from_iter(row.iter()))
            .map_err(|e| LoadError::store("inserting into", table.as_str(), e))?;
        if changed != 1 {
            return Err(LoadError::RowCountMismatch {
                table: table.to_string(),
                expected: 1,
                actual: changed,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn chunked_batches_are_exhaustive_and_ordered() {
        let data = rows(7);
        let batches: Vec<&[usize]> = partition(&data, BatchPolicy::from_size(3)).collect();
        assert_eq!(batches.iter().map(|b| b.len()).collect::<Vec<_>>(), vec![3, 3, 1]);
        assert_eq!(batches.concat(), data);
    }

    #[test]
    fn exact_multiple_keeps_full_last_batch() {
        let data = rows(6);
        let sizes: Vec<usize> = partition(&data, BatchPolicy::from_size(3)).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![3, 3]);
    }

    #[test]
    fn batch_larger_than_input_is_one_batch() {
        let data = rows(2);
        let sizes: Vec<usize> = partition(&data, BatchPolicy::from_size(100)).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2]);
    }

    #[test]
    fn whole_policy_is_one_batch() {
        let data = rows(5);
        let batches: Vec<&[usize]> = partition(&data, BatchPolicy::Whole).collect();
        assert_eq!(batches, vec![data.as_slice()]);
    }

    #[test]
    fn empty_input_has_no_batches() {
        let data: Vec<usize> = Vec::new();
        assert_eq!(partition(&data, BatchPolicy::from_size(3)).count(), 0);
        assert_eq!(partition(&data, BatchPolicy::Whole).count(), 0);
    }

    #[test]
    fn for_each_batch_stops_on_error() {
        let data = rows(10);
        let mut seen = Vec::new();
        let err = for_each_batch(&data, BatchPolicy::from_size(4), |i, b| {
            seen.push(b.to_vec());
            if i == 1 {
                Err(LoadError::Config {
                    message: "stop".to_string(),
                })
            } else {
                Ok(())
            }
        })
        .unwrap_err();
        assert!(matches!(err, LoadError::Config { .. }));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn quotes_in_cells_are_stored_verbatim() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE \"t\" (\"a\" TEXT, \"b\" TEXT);").unwrap();
        let table = TableName::new("t");
        let data = vec![
            vec!["O'Hare".to_string(), "x'); DROP TABLE t; --".to_string()],
            vec!["\"q\"".to_string(), String::new()],
        ];
        insert_batch(&conn, &table, 2, &data).unwrap();

        let mut stmt = conn.prepare("SELECT a, b FROM t ORDER BY rowid").unwrap();
        let got: Vec<(String, String)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            got,
            vec![
                ("O'Hare".to_string(), "x'); DROP TABLE t; --".to_string()),
                ("\"q\"".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn failed_batch_leaves_no_rows() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE \"t\" (\"a\" TEXT NOT NULL UNIQUE);").unwrap();
        let table = TableName::new("t");
        let data = vec![vec!["1".to_string()], vec!["2".to_string()], vec!["1".to_string()]];

        let err = insert_batch(&conn, &table, 1, &data).unwrap_err();
        assert!(matches!(err, LoadError::Store { .. }));

        let n: i64 = conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn missing_table_is_a_store_error() {
        let conn = Connection::open_in_memory().unwrap();
        let err = insert_batch(&conn, &TableName::new("nope"), 1, &[vec!["1".to_string()]]).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
