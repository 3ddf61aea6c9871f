use crate::error::IssuerError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// `{"error": {"message": ...}}`, the body of every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorMessage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

/// HTTP-facing wrapper around `IssuerError`.
///
/// Messages are fixed per error kind; the underlying detail is only logged.
#[derive(Debug)]
pub struct ApiError(pub IssuerError);

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            IssuerError::NotFound(_) => (StatusCode::BAD_REQUEST, "transaction not found"),
            IssuerError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid request"),
            IssuerError::BackendUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "token storage unavailable")
            }
            IssuerError::GatewayError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "error calling iban gateway")
            }
            IssuerError::IssuanceError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "failed to issue credential")
            }
            IssuerError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
        }
    }
}

impl From<IssuerError> for ApiError {
    fn from(err: IssuerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::info!(error = %self.0, "request rejected");
        }

        envelope(status, message)
    }
}

/// Wraps `message` in the error body, for failures that never reach a handler.
pub fn envelope(status: StatusCode, message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorMessage {
            message: message.to_string(),
        },
    };
    (status, Json(body)).into_response()
}
