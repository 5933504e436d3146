use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rbac_core::{DomainError, ErrorKind};
use thiserror::Error;

use crate::response::ApiResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Domain(e) => match e.kind() {
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
                ErrorKind::AllocationFailure => (StatusCode::CONFLICT, "LEVEL_CODE_EXHAUSTED"),
                ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                ErrorKind::Storage => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
                ErrorKind::EngineRetryable => (StatusCode::SERVICE_UNAVAILABLE, "POLICY_GRANT_FAILED"),
                ErrorKind::EngineStale => (StatusCode::INTERNAL_SERVER_ERROR, "POLICY_REVOKE_FAILED"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), code, "{}", message);
        } else {
            tracing::warn!(status = status.as_u16(), code, "{}", message);
        }

        (status, Json(ApiResponse::<()>::error(code, &message))).into_response()
    }
}
