//! HTTP API for pricing, health checks and Prometheus metrics

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, JsonRejection, QueryRejection},
        DefaultBodyLimit, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pricer_lib::{
    ensure_columns, format_price, read_table, to_csv_bytes,
    health::{ComponentStatus, HealthRegistry},
    observability::{MODE_BATCH, MODE_SINGLE},
    CarListing, FormSpec, PricerError, PricerMetrics, PredictionService, ReferenceData,
    StructuredLogger, Table, REQUIRED_COLUMNS,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Suggested name of the downloaded batch result
pub const DOWNLOAD_FILE_NAME: &str = "saudi_used_car_predictions.csv";

const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: PredictionService,
    /// Absent when the reference data could not be loaded
    pub form: Option<FormSpec>,
    pub health_registry: HealthRegistry,
    pub metrics: PricerMetrics,
    pub logger: StructuredLogger,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        service: PredictionService,
        reference: Option<&ReferenceData>,
        health_registry: HealthRegistry,
        metrics: PricerMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            service,
            form: reference.map(ReferenceData::form_spec),
            health_registry,
            metrics,
            logger,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Count and log a failed request before it is rendered
    fn track<T>(&self, route: &str, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(err) = &result {
            self.metrics.inc_error(err.body.error);
            self.logger.log_rejected(route, err.body.error, &err.body.message);
        }
        result
    }
}

/// JSON error body returned for every failed request
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error,
                message: message.into(),
                missing: None,
            },
        }
    }

    fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "internal_error", message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<PricerError> for ApiError {
    fn from(err: PricerError) -> Self {
        let status = match err.kind() {
            "schema_error" => StatusCode::UNPROCESSABLE_ENTITY,
            "parse_error" | "validation_error" => StatusCode::BAD_REQUEST,
            "prediction_error" if err.is_client_error() => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %err, "Prediction pipeline failed");
        }
        Self {
            status,
            body: ErrorBody {
                error: err.kind(),
                message: err.to_string(),
                missing: err.missing_columns().map(<[String]>::to_vec),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "parse_error", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "parse_error", rejection.body_text())
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        Self::new(rejection.status(), "parse_error", rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("Prediction task failed: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub price: i64,
    pub formatted: String,
    pub model_version: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub rows: usize,
    pub columns: Vec<String>,
    pub preview: Vec<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewParams {
    pub rows: Option<usize>,
}

/// Run CPU-bound pipeline work off the async workers
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> pricer_lib::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await??)
}

/// Parse an uploaded CSV body and check it carries every required column
fn read_upload(body: Result<Bytes, BytesRejection>) -> Result<Table, ApiError> {
    let body = body?;
    let table = read_table(body.as_ref())?;
    ensure_columns(&table, &REQUIRED_COLUMNS)?;
    Ok(table)
}

/// Health check: 200 while operational, 503 once a component fails
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// Selection choices and numeric bounds for the single-car form
async fn options(State(state): State<Arc<AppState>>) -> Result<Json<FormSpec>, ApiError> {
    let result = state
        .form
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::unavailable("Reference data is not available"));
    state.track("/api/v1/options", result)
}

async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CarListing>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let result = predict_single(&state, payload).await;
    state.track("/api/v1/predict", result)
}

async fn predict_single(
    state: &AppState,
    payload: Result<Json<CarListing>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(listing) = payload?;
    if let Some(form) = &state.form {
        form.validate(&listing)?;
    }

    let started = Instant::now();
    let service = state.service.clone();
    let input = listing.clone();
    let price = blocking(move || service.predict_single(&input)).await?;

    state
        .metrics
        .observe_prediction(MODE_SINGLE, 1, started.elapsed().as_secs_f64());
    state.logger.log_single_prediction(
        &listing.make,
        &listing.model,
        listing.year,
        price,
        state.service.model_version(),
    );

    Ok(Json(PredictResponse {
        price: price as i64,
        formatted: format_price(price),
        model_version: state.service.model_version().to_string(),
    }))
}

/// Validate an upload and show its first rows
async fn batch_preview(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PreviewParams>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let result = preview_upload(params, body);
    state.track("/api/v1/batch/preview", result)
}

fn preview_upload(
    params: Result<Query<PreviewParams>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let Query(params) = params?;
    let table = read_upload(body)?;
    let shown = table.head(params.rows.unwrap_or(DEFAULT_PREVIEW_ROWS));
    Ok(Json(PreviewResponse {
        rows: table.len(),
        columns: table.columns().to_vec(),
        preview: shown.to_json_rows(),
    }))
}

async fn batch_predict(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let result = predict_upload(&state, body).await;
    state.track("/api/v1/batch/predict", result)
}

async fn predict_upload(
    state: &AppState,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let table = read_upload(body)?;
    let (rows, columns) = (table.len(), table.columns().len());

    let started = Instant::now();
    let service = state.service.clone();
    let csv = blocking(move || {
        let priced = service.predict_batch(&table)?;
        to_csv_bytes(&priced)
    })
    .await?;

    let elapsed = started.elapsed();
    state
        .metrics
        .observe_prediction(MODE_BATCH, rows, elapsed.as_secs_f64());
    state.logger.log_batch_prediction(
        rows,
        columns,
        elapsed.as_millis(),
        state.service.model_version(),
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME),
            ),
        ],
        csv,
    )
        .into_response())
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/options", get(options))
        .route("/api/v1/predict", post(predict))
        .route("/api/v1/batch/preview", post(batch_preview))
        .route("/api/v1/batch/predict", post(batch_predict))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Serve the API until ctrl-c
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_maps_to_422_with_missing() {
        let err = ApiError::from(PricerError::schema(vec!["Region".to_string()]));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.body.error, "schema_error");
        assert_eq!(err.body.missing.as_deref(), Some(&["Region".to_string()][..]));
    }

    #[test]
    fn test_status_by_kind() {
        let status = |e: PricerError| ApiError::from(e).status();
        assert_eq!(status(PricerError::Parse("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(PricerError::Validation(vec!["x".into()])),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(PricerError::UnknownCategory {
                column: "Make".into(),
                row: 0,
                value: "Lada".into()
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(PricerError::Prediction("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(PricerError::Shape("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
