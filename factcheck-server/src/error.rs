use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use factcheck_common::FactcheckError;
use factcheck_llm::verifier::VerifyError;
use serde::Serialize;

const UPSTREAM_SUGGESTION: &str = "Try again or contact support if the problem persists";

/// Failure body shared by every endpoint: `{success: false, error[, suggestion]}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    suggestion: Option<&'static str>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<&'static str>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.error
    }

    /// `/list-models` failures carry the bare upstream message.
    pub fn listing(e: FactcheckError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: e.detail(),
            suggestion: None,
        }
    }
}

impl From<VerifyError> for ApiError {
    fn from(e: VerifyError) -> Self {
        let status = if e.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let suggestion = matches!(e, VerifyError::Upstream(_)).then_some(UPSTREAM_SUGGESTION);
        Self {
            status,
            error: e.to_string(),
            suggestion,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::MissingJsonContentType(_) => "Content-Type must be application/json",
            _ => "Invalid JSON data",
        };
        tracing::debug!(%message, "rejected request body");
        VerifyError::InvalidRequest(message.to_string()).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: &self.error,
            suggestion: self.suggestion,
        };
        (self.status, Json(body)).into_response()
    }
}
