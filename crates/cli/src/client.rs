//! API client for communicating with the price server

use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

/// Errors returned by the price server or on the way to it
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server rejected the request with a structured error body
    #[error("{message}")]
    Api {
        kind: String,
        message: String,
        missing: Vec<String>,
    },

    #[error("Invalid API URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from server: {0}")]
    Decode(String),
}

impl ApiError {
    /// Columns the server reported missing from an upload
    pub fn missing_columns(&self) -> Option<&[String]> {
        match self {
            ApiError::Api { missing, .. } if !missing.is_empty() => Some(missing),
            _ => None,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            ApiError::Api { kind, .. } => kind,
            _ => "transport_error",
        }
    }
}

/// API client for the price server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let base_url = Url::parse(base_url)?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.base_url.join(path)?;
        let response = self.client.get(url).send().await?;
        decode(check(response).await?).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.base_url.join(path)?;
        let response = self.client.post(url).json(body).send().await?;
        decode(check(response).await?).await
    }

    /// Upload CSV bytes and decode a JSON answer
    pub async fn post_csv<T: DeserializeOwned>(
        &self,
        path: &str,
        csv: Vec<u8>,
    ) -> Result<T, ApiError> {
        let response = self.send_csv(path, csv).await?;
        decode(response).await
    }

    /// Upload CSV bytes and return the CSV the server sends back
    pub async fn post_csv_for_csv(&self, path: &str, csv: Vec<u8>) -> Result<Vec<u8>, ApiError> {
        let response = self.send_csv(path, csv).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Health is reported with 503 when a component fails, so that status still carries a body
    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        let url = self.base_url.join("healthz")?;
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return decode(response).await;
        }
        decode(check(response).await?).await
    }

    async fn send_csv(&self, path: &str, csv: Vec<u8>) -> Result<Response, ApiError> {
        let url = self.base_url.join(path)?;
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(csv)
            .send()
            .await?;
        check(response).await
    }
}

async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => ApiError::Api {
            kind: err.error,
            message: err.message,
            missing: err.missing.unwrap_or_default(),
        },
        Err(_) => ApiError::Api {
            kind: "http_error".to_string(),
            message: format!("API error ({}): {}", status, body),
            missing: Vec::new(),
        },
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

// API request and response types

/// One car as sent to the single prediction endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarListing {
    #[serde(rename = "Make")]
    pub make: String,
    #[serde(rename = "Type")]
    pub model: String,
    #[serde(rename = "Year")]
    pub year: i64,
    #[serde(rename = "Engine_Size")]
    pub engine_size: f64,
    #[serde(rename = "Mileage")]
    pub mileage: i64,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Gear_Type")]
    pub gear_type: String,
    #[serde(rename = "Origin")]
    pub origin: String,
    #[serde(rename = "Options")]
    pub options: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub price: i64,
    pub formatted: String,
    pub model_version: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RangeField<T> {
    pub min: T,
    pub max: T,
    pub step: T,
    pub default: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSpec {
    pub choices: BTreeMap<String, Vec<String>>,
    pub year: RangeField<i64>,
    pub engine_size: RangeField<f64>,
    pub mileage: RangeField<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub rows: usize,
    pub columns: Vec<String>,
    pub preview: Vec<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub model_version: Option<String>,
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_error_body_becomes_api_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/batch/preview")
            .with_status(422)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"error":"schema_error","message":"Missing required columns: [\"Region\"]","missing":["Region"]}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .post_csv::<PreviewResponse>("api/v1/batch/preview", b"Make\nToyota\n".to_vec())
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind(), "schema_error");
        assert_eq!(err.missing_columns().unwrap(), ["Region"]);
    }

    #[tokio::test]
    async fn test_plain_error_body_is_kept() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/options")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.get::<FormSpec>("api/v1/options").await.unwrap_err();
        assert!(err.to_string().contains("bad gateway"));
        assert!(err.missing_columns().is_none());
    }

    #[tokio::test]
    async fn test_unhealthy_server_still_reports_components() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/healthz")
            .with_status(503)
            .with_body(
                r#"{"status":"unhealthy","components":{"model":{"status":"unhealthy","message":"corrupt","last_check_timestamp":1}}}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();
        assert_eq!(health.status, "unhealthy");
        assert_eq!(health.components["model"].message.as_deref(), Some("corrupt"));
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(ApiClient::new("not a url"), Err(ApiError::Url(_))));
    }
}
