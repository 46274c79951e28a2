use crate::{api::ApiResponse, mailbox::MailboxError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("Store unavailable")]
    StoreUnavailable,
    #[error("{0}")]
    MailboxError(#[from] MailboxError),
    #[error("Invalid reading: {0}")]
    InvalidReading(String),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::MailboxError(MailboxError::Invalid(_))
            | AppError::InvalidReading(_)
            | AppError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            AppError::MailboxError(MailboxError::Pending(_)) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) | AppError::ConfigError(_) | AppError::IoError(_) | AppError::TaskError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed.");
        }
        let body = match &self {
            // a pending command is a normal outcome, not a fault
            AppError::MailboxError(MailboxError::Pending(_)) => ApiResponse::ignored("Command already present"),
            AppError::MailboxError(MailboxError::Invalid(_)) => ApiResponse::error("Invalid command", &self),
            AppError::InvalidReading(_) => ApiResponse::error("Failed to save moisture data", &self),
            AppError::InvalidQuery(_) => ApiResponse::error("Failed to fetch moisture data", &self),
            AppError::StoreUnavailable => ApiResponse::error("Failed to reach the data store", &self),
            _ => ApiResponse::error("Internal error", &self),
        };
        (status, Json(body)).into_response()
    }
}
