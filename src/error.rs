use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Tag carried by a failed analysis. Callers branch on this instead of
/// matching error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RateLimited,
    QuotaExhausted,
    Upstream,
    Network,
    Validation,
}

impl ErrorKind {
    /// Notification title shown for this kind of failure.
    pub fn title(self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "Rate limited",
            ErrorKind::QuotaExhausted => "Service quota exhausted",
            ErrorKind::Upstream => "Analysis Failed",
            ErrorKind::Network => "Backend unreachable",
            ErrorKind::Validation => "Invalid file",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("not an image")]
    NotAnImage,

    #[error("empty file")]
    Empty,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid listen address '{value}': {source}")]
    InvalidAddr {
        value: String,
        source: std::net::AddrParseError,
    },

    #[error("unknown backend '{0}', expected 'inference' or 'proxy'")]
    UnknownBackend(String),

    #[error("invalid value for {name}: '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

/// Failures of the `/analyze-plant` handler. Messages are what the caller
/// sees; upstream details stay in the server log.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("credential not configured")]
    MissingCredential,

    #[error("invalid request body")]
    InvalidPayload,

    #[error("image too large")]
    PayloadTooLarge,

    #[error("Rate limit exceeded. Please try again in a moment.")]
    RateLimited,

    #[error("AI service credits exhausted. Please contact support.")]
    QuotaExhausted,

    #[error("AI analysis failed")]
    Upstream,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::MissingCredential => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::InvalidPayload => StatusCode::BAD_REQUEST,
            ProxyError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::QuotaExhausted => StatusCode::PAYMENT_REQUIRED,
            ProxyError::Upstream => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
