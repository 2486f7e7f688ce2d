//! Price prediction engine

mod features;
mod inference;
mod output;
mod reconcile;
mod service;

#[cfg(test)]
mod tests;

pub use features::{
    FeatureConfig, FeatureEngineer, DEFAULT_BIG_ENGINE_CUTOFF, DEFAULT_CURRENT_YEAR,
    DEFAULT_VINTAGE_CUTOFF, DROPPED_COLUMNS,
};
pub use inference::{
    FeatureKind, FeatureSpec, ModelManifest, OnnxPriceModel, MANIFEST_FILE, MODEL_FILE,
};
pub use output::{format_price, round_price, CURRENCY};
pub use reconcile::ColumnReconciler;
pub use service::PredictionService;

use crate::error::Result;
use crate::models::Table;

/// Trait for price model implementations
///
/// Models are loaded once and shared read-only, so `predict` takes `&self`.
pub trait PriceModel: Send + Sync {
    /// Raw price estimate for every row of an engineered table, in row order
    fn predict(&self, features: &Table) -> Result<Vec<f64>>;

    /// Version string of the loaded artifact
    fn model_version(&self) -> &str;
}
