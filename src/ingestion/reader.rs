//! Delimited-file reader.

use std::path::Path;

use crate::error::{LoadError, LoadResult};
use crate::types::ParsedTable;

/// Read a comma-separated file into an in-memory [`ParsedTable`].
///
/// Rules:
///
/// - With `has_header`, the first record becomes the column names and every following record
///   must have the same number of fields. A mismatch fails the whole file.
/// - Without a header, no column names are derived and records may vary in length.
/// - Cells are kept verbatim: no trimming, no type coercion.
pub fn read_table(path: impl AsRef<Path>, has_header: bool) -> LoadResult<ParsedTable> {
    let path = path.as_ref();
    let mut rdr = builder(has_header)
        .from_path(path)
        .map_err(|source| file_read(path, source))?;
    read_table_from_reader(&mut rdr, has_header).map_err(|source| file_read(path, source))
}

/// Read records from an existing CSV reader.
///
/// The reader should be built with `has_headers(has_header)`; pass `flexible(false)` to enforce
/// a consistent field count.
pub fn read_table_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    has_header: bool,
) -> Result<ParsedTable, csv::Error> {
    let header = if has_header {
        rdr.headers()?.iter().map(str::to_owned).collect()
    } else {
        Vec::new()
    };

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_owned).collect());
    }

    Ok(ParsedTable::new(header, rows))
}

/// CSV reader settings used for source files.
pub fn builder(has_header: bool) -> csv::ReaderBuilder {
    let mut b = csv::ReaderBuilder::new();
    b.has_headers(has_header)
        .flexible(!has_header)
        .trim(csv::Trim::None);
    b
}

fn file_read(path: &Path, source: csv::Error) -> LoadError {
    LoadError::FileRead {
        path: path.to_path_buf(),
        source,
    }
}
