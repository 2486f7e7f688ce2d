//! Batch prediction session
//!
//! An upload moves `Idle -> Previewing` once the server has validated its
//! columns, and `Previewing -> Succeeded` only when predictions are requested
//! explicitly. Any failure returns the session to `Idle`.

use crate::client::{ApiClient, ApiError, PreviewResponse};
use thiserror::Error;

pub const PREVIEW_PATH: &str = "api/v1/batch/preview";
pub const PREDICT_PATH: &str = "api/v1/batch/predict";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No validated upload to predict; preview a file first")]
    NothingToPredict,

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug)]
pub enum SessionState {
    Idle,
    /// Upload validated; waiting for an explicit trigger
    Previewing {
        csv: Vec<u8>,
        preview: PreviewResponse,
    },
    /// Predictions ready for download
    Succeeded { rows: usize, csv: Vec<u8> },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Previewing { .. } => "previewing",
            SessionState::Succeeded { .. } => "succeeded",
        }
    }
}

pub struct BatchSession<'a> {
    client: &'a ApiClient,
    preview_rows: usize,
    state: SessionState,
}

impl<'a> BatchSession<'a> {
    pub fn new(client: &'a ApiClient, preview_rows: usize) -> Self {
        Self {
            client,
            preview_rows,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Validate an upload and fetch its first rows.
    ///
    /// A new upload replaces whatever the session held before.
    pub async fn upload(&mut self, csv: Vec<u8>) -> Result<PreviewResponse, SessionError> {
        self.state = SessionState::Idle;

        let path = format!("{}?rows={}", PREVIEW_PATH, self.preview_rows);
        let preview: PreviewResponse = self.client.post_csv(&path, csv.clone()).await?;

        self.state = SessionState::Previewing {
            csv,
            preview: preview.clone(),
        };
        Ok(preview)
    }

    /// Run predictions for the previewed upload and return the priced CSV
    pub async fn predict(&mut self) -> Result<Vec<u8>, SessionError> {
        let (csv, rows) = match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Previewing { csv, preview } => (csv, preview.rows),
            other => {
                self.state = other;
                return Err(SessionError::NothingToPredict);
            }
        };

        let priced = self.client.post_csv_for_csv(PREDICT_PATH, csv).await?;
        self.state = SessionState::Succeeded {
            rows,
            csv: priced.clone(),
        };
        Ok(priced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPLOAD: &[u8] = b"ID,Make,Type,Year,Engine_Size,Mileage,Region,Gear_Type,Origin,Options\n\
1,Toyota,Sedan,2018,2.0,80000,Riyadh,Automatic,Saudi,Standard\n";

    const PREVIEW: &str = r#"{"rows":1,"columns":["ID","Make"],"preview":[{"ID":1,"Make":"Toyota"}]}"#;

    #[tokio::test]
    async fn test_preview_then_predict() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/batch/preview")
            .match_query(mockito::Matcher::UrlEncoded("rows".into(), "5".into()))
            .with_status(200)
            .with_body(PREVIEW)
            .create_async()
            .await;
        let predict = server
            .mock("POST", "/api/v1/batch/predict")
            .with_status(200)
            .with_header("content-type", "text/csv")
            .with_body("ID,Predicted_Price\n1,84000\n")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let mut session = BatchSession::new(&client, 5);
        assert_eq!(session.state().name(), "idle");

        let preview = session.upload(UPLOAD.to_vec()).await.unwrap();
        assert_eq!(preview.rows, 1);
        match session.state() {
            SessionState::Previewing { csv, preview: held } => {
                assert_eq!(csv.as_slice(), UPLOAD);
                assert_eq!(held.columns, preview.columns);
            }
            other => panic!("expected previewing, got {}", other.name()),
        }

        let csv = session.predict().await.unwrap();
        assert_eq!(csv, b"ID,Predicted_Price\n1,84000\n");
        match session.state() {
            SessionState::Succeeded { rows, csv: held } => {
                assert_eq!(*rows, 1);
                assert_eq!(held, &csv);
            }
            other => panic!("expected succeeded, got {}", other.name()),
        }
        predict.assert_async().await;
    }

    #[tokio::test]
    async fn test_schema_rejection_returns_to_idle() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/batch/preview")
            .match_query(mockito::Matcher::Any)
            .with_status(422)
            .with_body(r#"{"error":"schema_error","message":"Missing required columns: [\"Region\"]","missing":["Region"]}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let mut session = BatchSession::new(&client, 5);
        let err = session.upload(UPLOAD.to_vec()).await.unwrap_err();

        match err {
            SessionError::Api(api) => assert_eq!(api.missing_columns().unwrap(), ["Region"]),
            other => panic!("expected Api error, got {:?}", other),
        }
        assert_eq!(session.state().name(), "idle");
    }

    #[tokio::test]
    async fn test_predict_requires_preview() {
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        let mut session = BatchSession::new(&client, 5);
        assert!(matches!(
            session.predict().await,
            Err(SessionError::NothingToPredict)
        ));
        assert_eq!(session.state().name(), "idle");
    }

    #[tokio::test]
    async fn test_failed_prediction_returns_to_idle() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/batch/preview")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(PREVIEW)
            .create_async()
            .await;
        server
            .mock("POST", "/api/v1/batch/predict")
            .with_status(422)
            .with_body(r#"{"error":"prediction_error","message":"Unknown Make value \"Lada\" at row 0: not seen during training"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let mut session = BatchSession::new(&client, 5);
        session.upload(UPLOAD.to_vec()).await.unwrap();

        let err = session.predict().await.unwrap_err();
        assert!(err.to_string().contains("Lada"));
        assert_eq!(session.state().name(), "idle");
    }
}
