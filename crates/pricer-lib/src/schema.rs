//! Column-level schema validation for incoming tables

use crate::error::{PricerError, Result};
use crate::models::{columns, Table};

/// Raw columns every record must carry, in model input order
pub const REQUIRED_COLUMNS: [&str; 9] = [
    columns::MAKE,
    columns::TYPE,
    columns::YEAR,
    columns::ENGINE_SIZE,
    columns::MILEAGE,
    columns::REGION,
    columns::GEAR_TYPE,
    columns::ORIGIN,
    columns::OPTIONS,
];

/// Required columns absent from the table, in the order they were requested
pub fn missing_columns(table: &Table, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|c| !table.has_column(c))
        .map(|c| c.to_string())
        .collect()
}

/// Fail with the exact list of missing columns, if any
pub fn ensure_columns(table: &Table, required: &[&str]) -> Result<()> {
    let missing = missing_columns(table, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PricerError::schema(missing))
    }
}
