// src/error.rs
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

/// Failure of an individual store operation, outside input validity.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError(err.to_string())
    }
}

/// Everything a handler can fail with, mapped onto the HTTP error envelope
/// `{error, details?}` by the `IntoResponse` impl below.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required path or query parameter was absent. Carries the full
    /// client-facing message, e.g. "Missing token".
    #[error("{0}")]
    Missing(&'static str),

    /// Malformed or out-of-range input.
    #[error("{message}")]
    Validation {
        message: &'static str,
        details: Option<Value>,
    },

    /// Missing, unknown or inactive token. Deliberately opaque: the response
    /// never reveals whether the poll itself exists.
    #[error("Invalid or inactive token")]
    Forbidden,

    /// The entity exists but does not belong to the asserted parent.
    #[error("{0}")]
    Scope(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    /// Backing-store configuration is absent.
    #[error("Server not configured")]
    Configuration,

    /// An individual store call failed; `context` is the client-facing
    /// message, `details` the backend diagnostic passed through verbatim.
    #[error("{context}: {details}")]
    Store {
        context: &'static str,
        details: String,
    },
}

impl ApiError {
    pub fn invalid(details: impl Into<String>) -> Self {
        ApiError::Validation {
            message: "Invalid input",
            details: Some(Value::String(details.into())),
        }
    }

    pub fn invalid_fields(issues: Value) -> Self {
        ApiError::Validation {
            message: "Invalid input",
            details: Some(issues),
        }
    }

    pub fn store(context: &'static str, err: StoreError) -> Self {
        ApiError::Store {
            context,
            details: err.0,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Missing(_) | ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Forbidden | ApiError::Scope(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Configuration | ApiError::Store { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{self}");
        }
        let body = match &self {
            ApiError::Validation {
                message,
                details: Some(details),
            } => json!({ "error": message, "details": details }),
            ApiError::Configuration => json!({
                "error": "Server not configured",
                "hint": "Set DATABASE_URL in your .env",
            }),
            ApiError::Store { context, details } => {
                json!({ "error": context, "details": details })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(ApiError::Missing("Missing token").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::invalid("nope").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Scope("Mismatched poll").status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("Poll not found").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Configuration.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::store("Failed to save availability", StoreError("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn forbidden_message_is_opaque() {
        assert_eq!(ApiError::Forbidden.to_string(), "Invalid or inactive token");
    }
}
