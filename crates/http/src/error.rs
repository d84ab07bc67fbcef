//! Error handling for the bookshelf HTTP layer

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

use bookshelf_kernel::FieldErrors;

const NOT_FOUND_MESSAGE: &str = "the requested resource could not be found";
const CONFLICT_MESSAGE: &str = "unable to complete the update due to a conflict, try again";
const VALIDATION_MESSAGE: &str = "one or more fields failed validation";
const INTERNAL_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {message}")]
    Validation {
        details: serde_json::Value,
        code: String,
        message: String,
    },

    #[error("conflict: {message}")]
    Conflict { message: String, code: String },

    #[error("not found: {message}")]
    NotFound { message: String, code: String },

    #[error("bad request: {message}")]
    BadRequest { message: String, code: String },

    #[error("method not allowed: {message}")]
    MethodNotAllowed { message: String, code: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a validation error whose details are the field-keyed messages
    pub fn failed_validation(errors: FieldErrors) -> Self {
        let details = errors
            .iter()
            .map(|(field, message)| (field.to_string(), json!(message)))
            .collect::<serde_json::Map<_, _>>();
        Self::Validation {
            details: serde_json::Value::Object(details),
            code: "validation_error".to_string(),
            message: VALIDATION_MESSAGE.to_string(),
        }
    }

    /// Create an edit conflict error
    pub fn edit_conflict() -> Self {
        Self::Conflict {
            message: CONFLICT_MESSAGE.to_string(),
            code: "edit_conflict".to_string(),
        }
    }

    /// Create a not found error with the default message
    pub fn not_found() -> Self {
        Self::NotFound {
            message: NOT_FOUND_MESSAGE.to_string(),
            code: "not_found".to_string(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            code: "bad_request".to_string(),
        }
    }

    /// Create an error for a known route that does not accept `method`
    pub fn method_not_allowed(method: &Method) -> Self {
        Self::MethodNotAllowed {
            message: format!("the {method} method is not supported for this resource"),
            code: "method_not_allowed".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        let status = self.status();

        let (error_code, message, details) = match self {
            AppError::Validation {
                details,
                code,
                message,
            } => (code, message, details),
            AppError::Conflict { message, code }
            | AppError::NotFound { message, code }
            | AppError::BadRequest { message, code }
            | AppError::MethodNotAllowed { message, code } => (code, message, json!({})),
            AppError::Internal(e) => {
                // Runs inside the request span, which carries method and URI.
                tracing::error!(
                    error_id = %error_id,
                    error = ?e,
                    "internal server error"
                );
                (
                    "internal_error".to_string(),
                    INTERNAL_MESSAGE.to_string(),
                    json!({}),
                )
            }
        };

        if status.is_client_error() {
            tracing::debug!(
                error_id = %error_id,
                error_code = %error_code,
                status_code = %status.as_u16(),
                "request rejected"
            );
        }

        let error_response = json!({
            "error": {
                "code": error_code,
                "message": message,
                "details": details,
                "trace_id": error_id.to_string(),
                "timestamp": timestamp
            }
        });

        (status, Json(error_response)).into_response()
    }
}
