//! Error types for the PDF Parser server
//!
//! Every failure on the conversion path ends up as a [`ServiceError`], which
//! renders the uniform `{success: false, error}` envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::convert::ConvertResponse;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Malformed request: bad base64, unknown enum value, empty payload
    #[error("{0}")]
    InvalidInput(String),

    /// The extractor failed, produced nothing usable, or the service is saturated
    #[error("{0}")]
    ConversionFailed(String),

    /// The conversion deadline elapsed
    #[error("{0}")]
    Timeout(String),

    /// Anything unanticipated; the message is logged but never sent to clients
    #[error("{0}")]
    InternalError(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::ConversionFailed(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message that is safe to return to the client
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) | Self::ConversionFailed(msg) | Self::Timeout(msg) => {
                msg.clone()
            }
            Self::InternalError(_) => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ServiceError::InternalError(detail) => {
                tracing::error!("Internal error: {}", detail);
            }
            ServiceError::ConversionFailed(msg) | ServiceError::Timeout(msg) => {
                tracing::warn!(status = status.as_u16(), "Conversion error: {}", msg);
            }
            ServiceError::InvalidInput(msg) => {
                tracing::debug!("Rejected request: {}", msg);
            }
        }

        let body = Json(ConvertResponse::failure(self.public_message()));
        (status, body).into_response()
    }
}
