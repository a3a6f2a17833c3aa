// rest_api/src/error.rs

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use medrec_models::RecordError;

#[derive(Debug, Error)]
pub enum RestApiError {
    #[error(transparent)]
    Record(#[from] RecordError),
    /// The request body was not JSON of the expected shape.
    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

impl From<JsonRejection> for RestApiError {
    fn from(rejection: JsonRejection) -> Self {
        RestApiError::MalformedBody(rejection.body_text())
    }
}

impl RestApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RestApiError::Record(RecordError::InvalidArgument(_)) => StatusCode::BAD_REQUEST,
            RestApiError::Record(RecordError::NotFound(_)) => StatusCode::NOT_FOUND,
            RestApiError::Record(RecordError::StoreFailure(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            RestApiError::Record(RecordError::MalformedResult(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            RestApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for RestApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        if status.is_server_error() {
            error!("{} {}", status, message);
        } else {
            warn!("{} {}", status, message);
        }

        let body = Json(json!({
            "status": "error",
            "message": message,
        }));

        (status, body).into_response()
    }
}
