//! # Error Handling
//!
//! One error enum for the whole façade, mapped onto HTTP responses via
//! actix-web's `ResponseError` trait.
//!
//! ## Taxonomy:
//! - **Conflict**: duplicate registration (409)
//! - **Unauthorized**: bad credentials or missing/invalid bearer token (401)
//! - **BadRequest / UnsupportedFormat / ValidationError**: client-side input
//!   problems (400)
//! - **Conversion**: the ffmpeg subprocess reported failure (500)
//! - **Recognition / Translation / Synthesis**: an external cloud service
//!   call failed (502 — the failure is upstream, not here)
//! - **Internal / ConfigError**: server-side problems (500)
//!
//! All failures are surfaced directly to the caller as a JSON body of the
//! form `{"error": {"type", "message", "timestamp"}}`; nothing is retried.

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Custom error types for the application.
#[derive(Debug)]
pub enum AppError {
    /// A resource already exists (duplicate username on register)
    Conflict(String),

    /// Missing or invalid credentials / bearer token
    Unauthorized(String),

    /// Client sent invalid or malformed data
    BadRequest(String),

    /// Uploaded audio container is outside the supported whitelist
    UnsupportedFormat(String),

    /// The transcoding subprocess failed
    Conversion(String),

    /// The speech recognition service returned an error
    Recognition(String),

    /// The translation service returned an error
    Translation(String),

    /// The speech synthesis service returned an error
    Synthesis(String),

    /// Internal server errors (blocking pool failures, I/O, etc.)
    Internal(String),

    /// Configuration file or environment variable problems
    ConfigError(String),

    /// User input failed validation rules
    ValidationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
            AppError::Conversion(msg) => write!(f, "Conversion error: {}", msg),
            AppError::Recognition(msg) => write!(f, "Recognition error: {}", msg),
            AppError::Translation(msg) => write!(f, "Translation error: {}", msg),
            AppError::Synthesis(msg) => write!(f, "Synthesis error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

/// Converts each error variant into an HTTP response with a JSON body.
///
/// The three gateway failures map to 502 Bad Gateway: the request was valid
/// and this service behaved correctly, the upstream dependency did not.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;

        let (status, error_type, message) = match self {
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::UnsupportedFormat(msg) => {
                (StatusCode::BAD_REQUEST, "unsupported_format", msg.clone())
            }
            AppError::Conversion(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "conversion_error", msg.clone())
            }
            AppError::Recognition(msg) => {
                (StatusCode::BAD_GATEWAY, "recognition_error", msg.clone())
            }
            AppError::Translation(msg) => {
                (StatusCode::BAD_GATEWAY, "translation_error", msg.clone())
            }
            AppError::Synthesis(msg) => (StatusCode::BAD_GATEWAY, "synthesis_error", msg.clone()),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
            AppError::ConfigError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone())
            }
            AppError::ValidationError(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("I/O error: {}", err))
    }
}

/// Blocking-pool failures (the closure itself returns its own AppError).
impl From<actix_web::error::BlockingError> for AppError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        AppError::Internal(format!("Blocking task error: {}", err))
    }
}

/// Type alias for Results that use our custom error type.
pub type AppResult<T> = Result<T, AppError>;
