//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use salesdash_core::{Error, OperationResult};

/// Error returned by every handler
///
/// The body is a failed [`OperationResult`] so clients see one envelope shape.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        let message = msg.into();
        tracing::warn!("Bad request: {}", message);
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        let message = msg.into();
        tracing::error!("Internal error: {}", message);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }

    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        let message = msg.into();
        tracing::warn!("Upstream failure: {}", message);
        Self {
            status: StatusCode::BAD_GATEWAY,
            message,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidFile(_) | Error::Validation(_) => Self::bad_request(err.to_string()),
            Error::Notification(_) => Self::bad_gateway(err.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<Error>() {
            Some(Error::InvalidFile(_) | Error::Validation(_)) => Self::bad_request(format!("{:#}", err)),
            Some(Error::Notification(_)) => Self::bad_gateway(format!("{:#}", err)),
            _ => Self::internal(format!("{:#}", err)),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("Background task failed: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = OperationResult::<()>::fail(self.message);
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_and_validation_errors_are_client_errors() {
        let err: ApiError = anyhow::Error::from(Error::invalid_file("bad workbook"))
            .context("Upload failed")
            .into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("bad workbook"));

        let err: ApiError = Error::validation("Month must be 1-12").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_errors_are_server_errors() {
        let err: ApiError = anyhow::Error::from(Error::database("disk full")).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
