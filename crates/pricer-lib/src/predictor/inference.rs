//! ONNX inference using tract
//!
//! The exported regression pipeline is a plain `[1, n_features]` f32 graph.
//! Everything the graph cannot express itself (feature order, categorical
//! vocabularies, artifact checksum) lives in a JSON manifest next to it.

use super::PriceModel;
use crate::error::{PricerError, Result};
use crate::models::{Table, Value};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, info, warn};

/// Model graph file inside the model directory
pub const MODEL_FILE: &str = "model.onnx";

/// Feature manifest file inside the model directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Per-row latency above which inference is logged as slow
const SLOW_ROW_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// How a manifest feature is encoded into the model input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FeatureKind {
    Numeric,
    Boolean,
    /// Encoded as the index of the value in the training vocabulary
    Categorical { categories: Vec<String> },
}

/// One model input feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: FeatureKind,
}

/// Description of the exported model's input layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: String,
    /// Hex SHA-256 of the model graph; verified on load when present
    #[serde(default)]
    pub sha256: Option<String>,
    pub features: Vec<FeatureSpec>,
}

impl ModelManifest {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    /// Encode one engineered row in manifest order.
    ///
    /// Engineered columns the manifest does not name are ignored.
    pub fn encode_row(&self, table: &Table, row: usize) -> Result<Vec<f32>> {
        self.features
            .iter()
            .map(|feature| {
                let value = table.value(row, &feature.name).ok_or_else(|| {
                    PricerError::Prediction(format!(
                        "model expects feature '{}' which the input does not provide",
                        feature.name
                    ))
                })?;
                encode_value(feature, value, row)
            })
            .collect()
    }
}

fn encode_value(feature: &FeatureSpec, value: &Value, row: usize) -> Result<f32> {
    let invalid = |expected: &'static str| PricerError::InvalidValue {
        column: feature.name.clone(),
        row,
        value: value.to_string(),
        expected,
    };

    match &feature.kind {
        FeatureKind::Numeric => value.as_f64().map(|v| v as f32).ok_or_else(|| invalid("number")),
        FeatureKind::Boolean => value
            .as_bool()
            .map(|b| if b { 1.0 } else { 0.0 })
            .ok_or_else(|| invalid("boolean")),
        FeatureKind::Categorical { categories } => {
            let text = value.to_string();
            categories
                .iter()
                .position(|c| *c == text)
                .map(|idx| idx as f32)
                .ok_or_else(|| PricerError::UnknownCategory {
                    column: feature.name.clone(),
                    row,
                    value: text,
                })
        }
    }
}

/// ONNX-based price model using tract for lightweight inference
pub struct OnnxPriceModel {
    model: TractModel,
    manifest: ModelManifest,
}

impl OnnxPriceModel {
    /// Load `model.onnx` and `manifest.json` from a model directory
    pub fn load(model_dir: &Path) -> Result<Self> {
        let manifest_path = model_dir.join(MANIFEST_FILE);
        let model_path = model_dir.join(MODEL_FILE);

        let manifest_json = std::fs::read_to_string(&manifest_path)
            .map_err(|e| load_error(&manifest_path, e))?;
        let manifest =
            ModelManifest::from_json(&manifest_json).map_err(|e| load_error(&manifest_path, e))?;
        let model_bytes = std::fs::read(&model_path).map_err(|e| load_error(&model_path, e))?;

        let model = Self::from_bytes(&model_bytes, manifest)
            .map_err(|e| load_error(&model_path, e))?;
        info!(
            path = %model_dir.display(),
            version = %model.manifest.version,
            features = model.manifest.features.len(),
            "Price model loaded"
        );
        Ok(model)
    }

    /// Build a model from graph bytes and its manifest
    pub fn from_bytes(model_bytes: &[u8], manifest: ModelManifest) -> anyhow::Result<Self> {
        if let Some(expected) = &manifest.sha256 {
            let computed = compute_checksum(model_bytes);
            if !computed.eq_ignore_ascii_case(expected) {
                anyhow::bail!("Checksum mismatch: expected {}, got {}", expected, computed);
            }
            debug!(checksum = %computed, "Model checksum validated");
        }
        if manifest.features.is_empty() {
            anyhow::bail!("Manifest lists no input features");
        }

        let model = Self::load_graph(model_bytes, manifest.features.len())?;
        Ok(Self { model, manifest })
    }

    /// Load and optimize an ONNX graph from bytes
    fn load_graph(model_bytes: &[u8], num_features: usize) -> anyhow::Result<TractModel> {
        use anyhow::Context;

        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, num_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    pub fn manifest(&self) -> &ModelManifest {
        &self.manifest
    }

    fn predict_row(&self, features: Vec<f32>) -> anyhow::Result<f64> {
        let input: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, features.len()), features)?.into();
        let result = self.model.run(tvec!(input.into()))?;
        let output = result
            .first()
            .ok_or_else(|| anyhow::anyhow!("No output from model"))?;
        let view = output.to_array_view::<f32>()?;
        let price = view
            .iter()
            .next()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Model output is empty"))?;
        Ok(price as f64)
    }
}

impl PriceModel for OnnxPriceModel {
    fn predict(&self, features: &Table) -> Result<Vec<f64>> {
        let mut prices = Vec::with_capacity(features.len());

        for row in 0..features.len() {
            let encoded = self.manifest.encode_row(features, row)?;
            let start = Instant::now();
            let price = self
                .predict_row(encoded)
                .map_err(|e| PricerError::Prediction(format!("row {}: {:#}", row, e)))?;

            let elapsed = start.elapsed();
            if elapsed.as_millis() > SLOW_ROW_MS {
                warn!(elapsed_ms = elapsed.as_millis(), row, "Inference exceeded {}ms target", SLOW_ROW_MS);
            }
            prices.push(price);
        }

        debug!(rows = prices.len(), "Inference completed");
        Ok(prices)
    }

    fn model_version(&self) -> &str {
        &self.manifest.version
    }
}

fn load_error(path: &Path, err: impl std::fmt::Display) -> PricerError {
    PricerError::ModelLoad {
        path: path.to_path_buf(),
        reason: format!("{:#}", err),
    }
}

/// Compute SHA256 checksum of data
fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
