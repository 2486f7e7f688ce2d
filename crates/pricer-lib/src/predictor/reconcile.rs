//! Column reconciliation for batch predictions
//!
//! The model only sees the required raw columns; everything else the caller
//! uploaded (their own `Price`, an `ID`, notes) rides along untouched and is
//! returned next to the prediction.

use super::output::round_price;
use crate::error::{PricerError, Result};
use crate::models::{columns, Table, Value};
use crate::schema::REQUIRED_COLUMNS;

/// Splits caller tables into model input and merges predictions back
#[derive(Debug, Clone)]
pub struct ColumnReconciler {
    required: Vec<&'static str>,
}

impl Default for ColumnReconciler {
    fn default() -> Self {
        Self::new(&REQUIRED_COLUMNS)
    }
}

impl ColumnReconciler {
    pub fn new(required: &[&'static str]) -> Self {
        Self {
            required: required.to_vec(),
        }
    }

    pub fn required(&self) -> &[&'static str] {
        &self.required
    }

    /// Required columns only, in required order
    pub fn model_input(&self, table: &Table) -> Result<Table> {
        table.select(&self.required)
    }

    /// Copy of the original table with an integer `Predicted_Price` column.
    ///
    /// Rows are matched by position; the price count must equal the row count.
    pub fn merge(&self, original: &Table, prices: &[f64]) -> Result<Table> {
        if prices.len() != original.len() {
            return Err(PricerError::Shape(format!(
                "{} predictions for {} rows",
                prices.len(),
                original.len()
            )));
        }

        let mut out = original.clone();
        out.set_column(
            columns::PREDICTED_PRICE,
            prices
                .iter()
                .map(|p| Value::Int(round_price(*p) as i64))
                .collect(),
        )?;
        Ok(out)
    }
}
