use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("invalid input: {0}")]
    InvalidClientInput(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid date/time: {0}")]
    InvalidDateTime(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error("missing caller identity")]
    Unauthenticated,
}

impl AppError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        AppError::StorageUnavailable(err.to_string())
    }

    pub fn model(err: impl std::fmt::Display) -> Self {
        AppError::ModelUnavailable(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::StorageUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ModelUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::InvalidClientInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::InvalidDateTime(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
