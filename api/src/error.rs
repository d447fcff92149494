//! Maps `GrvError` onto the HTTP status + `{error_kind, message, details?}`
//! body of spec §7. Every handler returns `Result<_, ApiError>`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use grievance_core::error::GrvError;
use serde_json::json;

pub struct ApiError(pub GrvError);

impl From<GrvError> for ApiError {
    fn from(err: GrvError) -> Self {
        Self(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(GrvError::Internal(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GrvError::NotFound { .. } => StatusCode::NOT_FOUND,
            GrvError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GrvError::Unauthorized => StatusCode::UNAUTHORIZED,
            GrvError::Forbidden(_) => StatusCode::FORBIDDEN,
            GrvError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            GrvError::ProofRequired { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            GrvError::Conflict { .. } => StatusCode::CONFLICT,
            GrvError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GrvError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GrvError::Database(_) | GrvError::Serialization(_) | GrvError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // INTERNAL never leaks its cause (spec §7); everything else surfaces
        // the error's own display text, which is already action-oriented.
        let message = match &self.0 {
            GrvError::Database(_) | GrvError::Serialization(_) | GrvError::Internal(_) => {
                "an internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "internal error");
        }

        let body = Json(json!({
            "error_kind": self.0.kind(),
            "message": message,
        }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
