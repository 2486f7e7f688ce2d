//! Price server - used car price estimation over HTTP
//!
//! Loads the trained model once at startup and serves single and batch
//! predictions. A model that cannot be loaded stops the process; missing
//! reference data only disables the form choices.

use anyhow::{Context, Result};
use price_server::{api, ServerConfig};
use pricer_lib::{
    health::{components, HealthRegistry},
    FeatureEngineer, OnnxPriceModel, PredictionService, PricerMetrics, PriceModel,
    ReferenceData, StructuredLogger,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting price-server");

    let config = ServerConfig::load()?;
    info!(
        model_dir = %config.model_dir.display(),
        current_year = config.current_year,
        "Server configured"
    );

    let health_registry = HealthRegistry::new();
    let metrics = PricerMetrics::new();
    let logger = StructuredLogger::new(&config.service_name);

    let model = OnnxPriceModel::load(&config.model_dir)
        .with_context(|| format!("Cannot start without a model in {}", config.model_dir.display()))?;
    logger.log_model_loaded(
        &config.model_dir.display().to_string(),
        model.model_version(),
        model.manifest().features.len(),
    );
    metrics.set_model_version(model.model_version());
    health_registry.register(components::MODEL).await;
    health_registry.set_model_version(model.model_version()).await;

    let reference = match ReferenceData::load(&config.reference_data) {
        Ok(reference) => {
            health_registry.register(components::REFERENCE_DATA).await;
            Some(reference)
        }
        Err(e) => {
            warn!(
                path = %config.reference_data.display(),
                error = %e,
                "Reference data unavailable, form choices disabled"
            );
            health_registry
                .set_degraded(components::REFERENCE_DATA, e.to_string())
                .await;
            None
        }
    };

    let service = PredictionService::new(
        FeatureEngineer::new(config.feature_config()),
        Arc::new(model),
    );
    logger.log_startup(SERVER_VERSION, service.model_version(), config.api_port);

    let app_state = Arc::new(
        api::AppState::new(
            service,
            reference.as_ref(),
            health_registry.clone(),
            metrics,
            logger.clone(),
        )
        .with_max_upload_bytes(config.max_upload_bytes),
    );

    health_registry.set_ready(true).await;

    api::serve(config.api_port, app_state).await?;
    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
