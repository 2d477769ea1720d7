use crate::error::ReorderResult;
use crate::types::RawTable;
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Read a CSV export into a `RawTable`.
///
/// Rows may have any number of cells; blank lines and rows made only of
/// empty cells are skipped.
pub fn read_table<R: Read>(name: &str, reader: R) -> ReorderResult<RawTable> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    let mut blank_rows = 0usize;
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|c| c.trim().is_empty()) {
            blank_rows += 1;
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!(table = name, rows = rows.len(), blank_rows, "read table");
    Ok(RawTable::new(name, headers, rows))
}

pub fn read_table_file(name: &str, path: impl AsRef<Path>) -> ReorderResult<RawTable> {
    let file = std::fs::File::open(path.as_ref())?;
    read_table(name, file)
}
