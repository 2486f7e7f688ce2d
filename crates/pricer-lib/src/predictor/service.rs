//! Prediction service shared by the single and batch paths

use super::{round_price, ColumnReconciler, FeatureEngineer, PriceModel};
use crate::error::{PricerError, Result};
use crate::models::{CarListing, Table};
use crate::schema::ensure_columns;
use std::sync::Arc;
use tracing::debug;

/// Validates, engineers and prices records against one loaded model
#[derive(Clone)]
pub struct PredictionService {
    engineer: FeatureEngineer,
    reconciler: ColumnReconciler,
    model: Arc<dyn PriceModel>,
}

impl PredictionService {
    pub fn new(engineer: FeatureEngineer, model: Arc<dyn PriceModel>) -> Self {
        Self {
            engineer,
            reconciler: ColumnReconciler::default(),
            model,
        }
    }

    pub fn engineer(&self) -> &FeatureEngineer {
        &self.engineer
    }

    pub fn model_version(&self) -> &str {
        self.model.model_version()
    }

    /// Rounded price for every row of a raw table, in row order
    pub fn predict(&self, rows: &Table) -> Result<Vec<f64>> {
        ensure_columns(rows, self.reconciler.required())?;
        let features = self.engineer.transform(rows)?;
        let raw = self.model.predict(&features)?;

        if raw.len() != rows.len() {
            return Err(PricerError::Prediction(format!(
                "model returned {} prices for {} rows",
                raw.len(),
                rows.len()
            )));
        }
        if let Some(row) = raw.iter().position(|p| !p.is_finite()) {
            return Err(PricerError::Prediction(format!(
                "model returned a non-finite price for row {}",
                row
            )));
        }

        debug!(rows = rows.len(), model_version = %self.model_version(), "Predicted prices");
        Ok(raw.into_iter().map(round_price).collect())
    }

    /// Price one record entered through the form
    pub fn predict_single(&self, listing: &CarListing) -> Result<f64> {
        let prices = self.predict(&listing.to_table())?;
        prices
            .first()
            .copied()
            .ok_or_else(|| PricerError::Prediction("model returned no price".to_string()))
    }

    /// Price an uploaded table and return it with a `Predicted_Price` column.
    ///
    /// Only the required columns reach the model; the output keeps every
    /// original column in its original order.
    pub fn predict_batch(&self, table: &Table) -> Result<Table> {
        ensure_columns(table, self.reconciler.required())?;
        let input = self.reconciler.model_input(table)?;
        let prices = self.predict(&input)?;
        self.reconciler.merge(table, &prices)
    }
}
