//! Error taxonomy for the pricing pipeline

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PricerError>;

/// Errors produced while validating, transforming or predicting records
#[derive(Debug, Error)]
pub enum PricerError {
    /// Required raw columns are absent from the input table
    #[error("Missing required columns: {missing:?}")]
    Schema { missing: Vec<String> },

    /// Uploaded data is not valid tabular data
    #[error("Could not read CSV: {0}")]
    Parse(String),

    /// A cell could not be interpreted as the type its column requires
    #[error("Invalid value {value:?} in column '{column}' at row {row}: expected {expected}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
        expected: &'static str,
    },

    /// A categorical value the model never saw during training
    #[error("Unknown {column} value {value:?} at row {row}: not seen during training")]
    UnknownCategory {
        column: String,
        row: usize,
        value: String,
    },

    /// Single-record input outside the accepted form bounds
    #[error("Invalid input: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Model invocation failed or produced an unusable result
    #[error("Prediction failed: {0}")]
    Prediction(String),

    /// The model artifact could not be loaded
    #[error("Failed to load model from {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    /// Rows and columns do not line up
    #[error("Table shape mismatch: {0}")]
    Shape(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PricerError {
    pub fn schema(missing: Vec<String>) -> Self {
        PricerError::Schema { missing }
    }

    /// Stable machine-readable kind used in API responses and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            PricerError::Schema { .. } => "schema_error",
            PricerError::Parse(_) => "parse_error",
            PricerError::Validation(_) => "validation_error",
            PricerError::InvalidValue { .. }
            | PricerError::UnknownCategory { .. }
            | PricerError::Prediction(_)
            | PricerError::ModelLoad { .. } => "prediction_error",
            PricerError::Shape(_) | PricerError::Io(_) => "internal_error",
        }
    }

    /// True when the error is caused by the caller's data rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PricerError::Schema { .. }
                | PricerError::Parse(_)
                | PricerError::Validation(_)
                | PricerError::InvalidValue { .. }
                | PricerError::UnknownCategory { .. }
        )
    }

    /// Missing column names, if this is a schema error
    pub fn missing_columns(&self) -> Option<&[String]> {
        match self {
            PricerError::Schema { missing } => Some(missing),
            _ => None,
        }
    }
}

impl From<csv::Error> for PricerError {
    fn from(err: csv::Error) -> Self {
        PricerError::Parse(err.to_string())
    }
}
