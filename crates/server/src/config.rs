//! Server configuration

use anyhow::{Context, Result};
use pricer_lib::FeatureConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Server configuration
///
/// Read from an optional `pricer.toml` in the working directory, then from
/// `PRICER_*` environment variables, which take precedence.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name attached to structured log events
    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory holding `model.onnx` and `manifest.json`
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Cleaned training extract used for the form's choices
    #[serde(default = "default_reference_data")]
    pub reference_data: PathBuf,

    #[serde(default = "default_current_year")]
    pub current_year: i64,

    #[serde(default = "default_vintage_cutoff")]
    pub vintage_cutoff: i64,

    #[serde(default = "default_big_engine_cutoff")]
    pub big_engine_cutoff: f64,

    /// Largest accepted CSV upload
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_service_name() -> String {
    "price-server".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("model")
}

fn default_reference_data() -> PathBuf {
    PathBuf::from("data/cleaned_outliers_data_saudi_used_cars.csv")
}

fn default_current_year() -> i64 {
    pricer_lib::predictor::DEFAULT_CURRENT_YEAR
}

fn default_vintage_cutoff() -> i64 {
    pricer_lib::predictor::DEFAULT_VINTAGE_CUTOFF
}

fn default_big_engine_cutoff() -> f64 {
    pricer_lib::predictor::DEFAULT_BIG_ENGINE_CUTOFF
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            api_port: default_api_port(),
            model_dir: default_model_dir(),
            reference_data: default_reference_data(),
            current_year: default_current_year(),
            vintage_cutoff: default_vintage_cutoff(),
            big_engine_cutoff: default_big_engine_cutoff(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `pricer.toml` and the environment
    pub fn load() -> Result<Self> {
        Self::build(config::File::with_name("pricer").required(false))
    }

    /// Load configuration from an explicit file, still overridden by the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::build(config::File::from(path).required(true))
    }

    fn build<S>(file: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix("PRICER").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn feature_config(&self) -> FeatureConfig {
        FeatureConfig {
            current_year: self.current_year,
            vintage_cutoff: self.vintage_cutoff,
            big_engine_cutoff: self.big_engine_cutoff,
        }
    }
}
