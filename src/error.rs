use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// AppError
///
/// The single error type returned by every handler and extractor. Each variant maps to one
/// HTTP status and renders as the uniform `{success: false, error, message}` body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing, malformed, expired or otherwise unverifiable credential (401).
    #[error("{0}")]
    Unauthenticated(String),

    /// The credential is valid but lacks the permission the endpoint declares (403).
    #[error("permission not found")]
    Forbidden,

    /// No route matches the path (404).
    #[error("resource not found")]
    NotFound,

    /// The path exists but not for this HTTP verb (405).
    #[error("method not allowed")]
    MethodNotAllowed,

    /// Invalid payload, unknown record id, or a write the store refused (422).
    #[error("unprocessable")]
    Unprocessable,

    /// Anything raised by the persistence layer.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unexpected failure. The reason is logged, never returned to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

/// ErrorBody
///
/// Wire shape of every failed response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub error: u16,
    pub message: String,
}

impl AppError {
    /// Status code and client-facing message for this error.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Unauthenticated(reason) => (StatusCode::UNAUTHORIZED, reason.clone()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, self.to_string()),
            AppError::Unprocessable => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::Internal(reason) => {
                tracing::error!(error = %reason, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let body = ErrorBody {
            success: false,
            error: status.as_u16(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// classify_sqlx_error
///
/// Integrity violations (SQLSTATE class 23: not-null, unique, check, foreign key) are the
/// client's fault and map to 422. Everything else is a server failure.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "unprocessable".to_string(),
        ),
        sqlx::Error::Database(db_err)
            if db_err.code().is_some_and(|code| code.starts_with("23")) =>
        {
            tracing::warn!(error = %db_err, "constraint violation");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unprocessable".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    }
}

/// Convenience alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;
