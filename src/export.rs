//! Optional persistence of the output table as CSV

use crate::errors::Result;
use crate::table::OutputTable;
use polars::prelude::{CsvWriter, SerWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Write `table` as CSV to `path`. `None` skips the step.
///
/// Returns whether a file was written. No-data cells are written as empty fields.
///
/// # Errors
///
/// Returns an error if the file cannot be created or the table cannot be encoded.
pub fn export_table(table: &OutputTable, path: Option<&Path>) -> Result<bool> {
    let Some(path) = path else {
        return Ok(false);
    };

    let mut df = table.to_dataframe()?;
    let writer = BufWriter::new(File::create(path)?);
    CsvWriter::new(writer).finish(&mut df)?;

    info!(path = %path.display(), rows = table.len(), "exported zonal table");
    Ok(true)
}

/// Encode `table` as a CSV string.
///
/// # Errors
///
/// Returns an error if the table cannot be encoded.
pub fn table_to_csv_string(table: &OutputTable) -> Result<String> {
    let mut df = table.to_dataframe()?;
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer).finish(&mut df)?;
    String::from_utf8(buffer).map_err(|e| format!("CSV output is not valid UTF-8: {e}").into())
}
