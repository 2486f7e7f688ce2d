//! Data loading and processing utilities

mod csv_table;
mod reference;

pub use csv_table::{read_table, read_table_from_path, to_csv_bytes, write_table};
pub use reference::{FormSpec, RangeField, ReferenceData, CHOICE_COLUMNS};
