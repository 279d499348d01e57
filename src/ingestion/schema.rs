//! Table definitions derived from header rows.

use std::collections::HashSet;
use std::path::Path;

use crate::error::{LoadError, LoadResult};
use crate::types::{TableName, quote_ident};

/// Build the `CREATE TABLE` statement for `table`, declaring every column as `TEXT` in header
/// order. No key, index, or constraint is declared.
///
/// `path` is only used for error reporting. Headers with no columns, or with the same column
/// name twice (compared ASCII case-insensitively, as SQLite does), are rejected.
pub fn create_table_statement(path: &Path, table: &TableName, columns: &[String]) -> LoadResult<String> {
    validate_columns(path, columns)?;
    let defs: Vec<String> = columns
        .iter()
        .map(|c| format!("{} TEXT", quote_ident(c)))
        .collect();
    Ok(format!("CREATE TABLE {} ({});", table.quoted(), defs.join(", ")))
}

/// Build the parameterized single-row insert used for every row of a batch.
pub fn insert_statement(table: &TableName, column_count: usize) -> String {
    let placeholders: Vec<String> = (1..=column_count).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} VALUES ({});",
        table.quoted(),
        placeholders.join(", ")
    )
}

fn validate_columns(path: &Path, columns: &[String]) -> LoadResult<()> {
    if columns.is_empty() {
        return Err(LoadError::InvalidHeader {
            path: path.to_path_buf(),
            message: "file has no header row".to_string(),
        });
    }

    let mut seen = HashSet::with_capacity(columns.len());
    for c in columns {
        if !seen.insert(c.to_ascii_lowercase()) {
            return Err(LoadError::InvalidHeader {
                path: path.to_path_buf(),
                message: format!("duplicate column '{c}'. headers={columns:?}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn every_column_is_text_in_header_order() {
        let sql = create_table_statement(
            Path::new("stops.txt"),
            &TableName::new("stops"),
            &cols(&["stop_id", "stop_name", "stop_lat"]),
        )
        .unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"stops\" (\"stop_id\" TEXT, \"stop_name\" TEXT, \"stop_lat\" TEXT);"
        );
    }

    #[test]
    fn column_names_are_quoted() {
        let sql = create_table_statement(Path::new("t.txt"), &TableName::new("t"), &cols(&["a\"b", "order"]))
            .unwrap();
        assert!(sql.contains("\"a\"\"b\" TEXT"));
        assert!(sql.contains("\"order\" TEXT"));
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let err = create_table_statement(Path::new("t.txt"), &TableName::new("t"), &cols(&["id", "ID"]))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate column 'ID'"));
    }

    #[test]
    fn empty_header_is_rejected() {
        let err = create_table_statement(Path::new("t.txt"), &TableName::new("t"), &[]).unwrap_err();
        assert!(matches!(err, LoadError::InvalidHeader { .. }));
    }

    #[test]
    fn insert_uses_numbered_placeholders() {
        assert_eq!(
            insert_statement(&TableName::new("routes"), 3),
            "INSERT INTO \"routes\" VALUES (?1, ?2, ?3);"
        );
    }
}
