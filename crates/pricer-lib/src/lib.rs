//! Core library for used car price estimation
//!
//! This crate provides the core functionality for:
//! - Tabular record handling and CSV input/output
//! - Schema validation of uploaded tables
//! - Feature engineering for the price model
//! - ONNX model inference and the prediction service
//! - Reference data for selection choices
//! - Health checks and observability

pub mod data;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod schema;

pub use data::{read_table, to_csv_bytes, write_table, FormSpec, RangeField, ReferenceData};
pub use error::{PricerError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::{columns, CarListing, Table, Value};
pub use observability::{PricerMetrics, StructuredLogger};
pub use predictor::{
    format_price, round_price, ColumnReconciler, FeatureConfig, FeatureEngineer, OnnxPriceModel,
    PredictionService, PriceModel,
};
pub use schema::{ensure_columns, missing_columns, REQUIRED_COLUMNS};
