use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use summarizer_ai::WorkflowError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed form fields; rendered as `{"error": true}`
    #[error("Invalid form: {0}")]
    InvalidForm(String),

    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Workflow(#[from] WorkflowError),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::InvalidForm(ref reason) = self {
            tracing::debug!("Rejecting form submission: {}", reason);
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": true }))).into_response();
        }

        let status = match &self {
            ApiError::InvalidForm(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Workflow(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
