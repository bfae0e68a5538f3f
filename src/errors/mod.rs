//! Error handling module for the DevCamper backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const DUPLICATE_KEY: &str = "DUPLICATE_KEY";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Message returned for malformed identifiers. Deliberately generic.
pub const RESOURCE_NOT_FOUND: &str = "Resource not found";

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Missing or invalid credential
    Unauthorized(String),
    /// Role or ownership violation
    Forbidden(String),
    /// Explicit lookup miss
    NotFound(String),
    /// Identifier that cannot name any resource
    CastError(String),
    /// One message per violated constraint
    Validation(Vec<String>),
    /// Unique constraint violated
    DuplicateKey(String),
    /// Bad request
    BadRequest(String),
    /// Database error
    Database(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Shorthand for a single-message validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(vec![message.into()])
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::CastError(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::DuplicateKey(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::Forbidden(_) => codes::FORBIDDEN,
            AppError::NotFound(_) | AppError::CastError(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::DuplicateKey(_) => codes::DUPLICATE_KEY,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the client-facing error message.
    ///
    /// Server-side failures never expose their detail; see [`AppError::detail`].
    pub fn message(&self) -> String {
        match self {
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::DuplicateKey(msg)
            | AppError::BadRequest(msg) => msg.clone(),
            AppError::CastError(_) => RESOURCE_NOT_FOUND.to_string(),
            AppError::Validation(messages) => messages.join(", "),
            AppError::Database(_) | AppError::Internal(_) => "Server Error".to_string(),
        }
    }

    /// Full detail, for logs.
    pub fn detail(&self) -> String {
        match self {
            AppError::Database(msg) | AppError::Internal(msg) | AppError::CastError(msg) => {
                msg.clone()
            }
            other => other.message(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.detail())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                tracing::debug!("Unique constraint violated: {}", db_err);
                return AppError::DuplicateKey(duplicate_message(db_err.message()));
            }
        }
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("Invalid value for {}", field),
                })
            })
            .collect();
        // HashMap iteration order is unstable; keep responses deterministic
        messages.sort();
        AppError::Validation(messages)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => AppError::validation(e.body_text()),
            other => AppError::BadRequest(other.body_text()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("Token rejected: {}", err);
        AppError::Unauthorized("Not authorized to access this route".to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        AppError::Internal(format!("Password hashing error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Geocoder request failed: {:?}", err);
        AppError::Internal(format!("Geocoder request failed: {}", err))
    }
}

impl From<lettre::transport::smtp::Error> for AppError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        tracing::error!("SMTP error: {:?}", err);
        AppError::Internal(format!("SMTP error: {}", err))
    }
}

impl From<lettre::error::Error> for AppError {
    fn from(err: lettre::error::Error) -> Self {
        tracing::error!("Email build error: {:?}", err);
        AppError::Internal(format!("Email build error: {}", err))
    }
}

impl From<lettre::address::AddressError> for AppError {
    fn from(err: lettre::address::AddressError) -> Self {
        tracing::debug!("Invalid mailbox: {}", err);
        AppError::Internal(format!("Invalid mailbox: {}", err))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("Blocking task failed: {:?}", err);
        AppError::Internal(format!("Blocking task failed: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("I/O error: {:?}", err);
        AppError::Internal(format!("I/O error: {}", err))
    }
}

/// Turn a SQLite unique-violation message into a client-facing one.
///
/// SQLite reports `UNIQUE constraint failed: <table>.<column>`.
fn duplicate_message(raw: &str) -> String {
    match raw.rsplit('.').next() {
        Some(column) if raw.contains("UNIQUE") => {
            format!("Duplicate field value entered for {}", column.trim())
        }
        _ => "Duplicate field value entered".to_string(),
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        let details = match error {
            AppError::Validation(messages) => Some(serde_json::json!(messages)),
            _ => None,
        };

        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
                details,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }
        (status, Json(ErrorResponse::new(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::DuplicateKey("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::CastError("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_cast_error_is_generic() {
        let err = AppError::CastError("invalid uuid 'abc'".into());
        assert_eq!(err.message(), RESOURCE_NOT_FOUND);
        assert_eq!(err.error_code(), codes::NOT_FOUND);
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let err = AppError::Database("disk I/O error at page 7".into());
        assert_eq!(err.message(), "Server Error");
        assert!(err.detail().contains("page 7"));
    }

    #[test]
    fn test_validation_envelope_lists_messages() {
        let err = AppError::Validation(vec!["Please add a name".into(), "Bad email".into()]);
        let body = ErrorResponse::new(&err);
        assert!(!body.success);
        assert_eq!(body.error.code, codes::VALIDATION_ERROR);
        assert_eq!(
            body.error.details,
            Some(serde_json::json!(["Please add a name", "Bad email"]))
        );
    }

    #[test]
    fn test_duplicate_message() {
        assert_eq!(
            duplicate_message("UNIQUE constraint failed: bootcamps.name"),
            "Duplicate field value entered for name"
        );
        assert_eq!(duplicate_message("boom"), "Duplicate field value entered");
    }
}
