// Error types: the widget engine's taxonomy plus the axum-facing wrapper
// used by the HTTP handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors surfaced by the booking widget engine.
///
/// `Configuration` is fatal and halts widget initialization. Everything else
/// is recoverable: the session converts it into a transient user-visible
/// message and keeps its state (validation failures never mutate the
/// selection; pricing failures keep the selected dates so the user can
/// retry).
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("{0}")]
    Network(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Pricing(String),
}

// Define a custom application error type for the HTTP layer
#[derive(Debug)]
pub enum AppError {
    InternalServerError(anyhow::Error),
    BadRequest(String),
}

// Implement conversion from anyhow::Error for easier error propagation
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::InternalServerError(error)
    }
}

// Implement IntoResponse for AppError to convert errors into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(e) => {
                // Log the detailed error here; don't expose internals
                tracing::error!("Internal server error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(message) => {
                tracing::warn!("Bad request: {}", message);
                (StatusCode::BAD_REQUEST, message)
            }
        };

        (status, error_message).into_response()
    }
}

// Define a custom Result type using our AppError
pub type AppResult<T> = Result<T, AppError>;
