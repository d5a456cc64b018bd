//! API error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::container::{ContainerError, EngineError};
use crate::daemon::DaemonError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// Requested host port is taken
    #[error("{0}")]
    PortConflict(String),

    #[error("{0}")]
    NotFound(String),

    /// Wrong method, or an image that cannot be run as-is
    #[error("{0}")]
    MethodNotAllowed(String),

    #[error("{0}")]
    Internal(String),

    /// Engine daemon is down or could not be started
    #[error("{0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PortConflict(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Response body. Successes and failures share the same shape; for failures
/// `data` is the error message.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), "{}", self);
        } else {
            warn!(status = status.as_u16(), "{}", self);
        }

        (status, Json(Envelope::new(self.to_string()))).into_response()
    }
}

impl From<ContainerError> for ApiError {
    fn from(err: ContainerError) -> Self {
        let message = err.to_string();
        match err {
            ContainerError::Validation(_) => ApiError::BadRequest(message),
            ContainerError::PortConflict(_) => ApiError::PortConflict(message),
            ContainerError::NotFound(_) => ApiError::NotFound(message),
            ContainerError::NoCommandDefined(_) => ApiError::MethodNotAllowed(message),
            ContainerError::OperationFailed {
                source: EngineError::Unreachable(_),
                ..
            } => ApiError::ServiceUnavailable(message),
            ContainerError::OperationFailed { .. } => ApiError::Internal(message),
        }
    }
}

impl From<DaemonError> for ApiError {
    fn from(err: DaemonError) -> Self {
        let message = err.to_string();
        match err {
            DaemonError::UnsupportedPlatform(_) => ApiError::Internal(message),
            DaemonError::Unreachable(_) | DaemonError::BootstrapFailed(_) => {
                ApiError::ServiceUnavailable(message)
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_error_status_codes() {
        let cases = [
            (ContainerError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (ContainerError::PortConflict(8080), StatusCode::FORBIDDEN),
            (ContainerError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                ContainerError::NoCommandDefined("scratch".into()),
                StatusCode::METHOD_NOT_ALLOWED,
            ),
            (
                ContainerError::operation("create", "web", EngineError::Other("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ContainerError::operation("list", "containers", EngineError::Unreachable("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }
    }

    #[test]
    fn test_daemon_error_status_codes() {
        assert_eq!(
            ApiError::from(DaemonError::UnsupportedPlatform("plan9".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(DaemonError::BootstrapFailed("none".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_port_conflict_message_names_port() {
        let err = ApiError::from(ContainerError::PortConflict(8080));
        assert_eq!(err.to_string(), "Host port 8080 is already in use");
    }
}
