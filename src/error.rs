use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use serde_json::json;
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Upload rejected: {0}")]
    UploadRejected(String),
    #[error("Error reading file: {0}")]
    Unreadable(String),
    #[error("No dataset has been uploaded")]
    NoDataset,
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Session store error: {0}")]
    SessionStore(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::SessionStore(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ParseError(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::UploadRejected(_) => StatusCode::BAD_REQUEST,
            AppError::Unreadable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NoDataset => StatusCode::NOT_FOUND,
            AppError::UnknownColumn(_) => StatusCode::NOT_FOUND,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SessionStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ParseError(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
