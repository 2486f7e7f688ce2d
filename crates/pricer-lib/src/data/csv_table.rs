//! CSV reading and writing for record tables

use crate::error::{PricerError, Result};
use crate::models::{Table, Value};
use std::io::{Read, Write};
use std::path::Path;

/// Parse a headed, comma-separated table.
///
/// Every row must be as wide as the header. Any malformation is reported as
/// a parse error carrying the underlying message; no partial table is returned.
pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(PricerError::Parse("No columns to parse from file".to_string()));
    }

    let mut names: Vec<&str> = Vec::with_capacity(headers.len());
    for name in headers.iter() {
        if names.contains(&name) {
            return Err(PricerError::Parse(format!("Duplicate column '{}'", name)));
        }
        names.push(name);
    }

    let mut table = Table::new(names.iter().copied());
    for record in csv_reader.records() {
        let record = record?;
        table.push_row(record.iter().map(Value::parse).collect())?;
    }
    Ok(table)
}

pub fn read_table_from_path(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path)?;
    read_table(std::io::BufReader::new(file))
}

/// Write a table with a header row
pub fn write_table<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(table.columns())?;
    for row in table.rows() {
        csv_writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// UTF-8 CSV bytes for download
pub fn to_csv_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_table(table, &mut buffer)?;
    Ok(buffer)
}
