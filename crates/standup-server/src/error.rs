use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use standup_core::error::StandupError;

/// Carries an explicit 400 through the `anyhow::Error` chain for request
/// problems that have no `StandupError` variant (e.g. a malformed date).
#[derive(Debug)]
struct BadRequestError(String);

impl std::fmt::Display for BadRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequestError {}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequestError(msg.into()).into())
    }
}

fn status_for(e: &StandupError) -> StatusCode {
    match e {
        StandupError::NotInitialized => StatusCode::BAD_REQUEST,
        StandupError::MemberNotFound(_) => StatusCode::NOT_FOUND,
        StandupError::ReportExists { .. } => StatusCode::CONFLICT,
        StandupError::InvalidMemberId(_) | StandupError::InvalidRunKind(_) => {
            StatusCode::BAD_REQUEST
        }
        StandupError::StoreUnavailable(_) | StandupError::NotifierFailure { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        StandupError::Configuration(_)
        | StandupError::InvariantViolation(_)
        | StandupError::Io(_)
        | StandupError::Yaml(_)
        | StandupError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.downcast_ref::<BadRequestError>().is_some() {
            StatusCode::BAD_REQUEST
        } else if let Some(e) = self.0.downcast_ref::<StandupError>() {
            status_for(e)
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
