//! API error type and response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

use sshpair_core::PairError;
use sshpair_logging::redact_sensitive_data;

/// A pairing failure on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub PairError);

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<PairError> for ApiError {
    fn from(err: PairError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            PairError::NotFound(_) => StatusCode::NOT_FOUND,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.0.kind();
        let message = self.0.to_string();

        if status.is_server_error() {
            warn!(code, error = %redact_sensitive_data(&message), "Request failed");
        }

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError(PairError::InvalidToken).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError(PairError::TokenExpired).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError(PairError::MissingUsername).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError(PairError::NotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError(PairError::ValidationFailed("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError(PairError::WriteFailed("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
