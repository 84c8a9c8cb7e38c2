//! Error types for the provider core.
//!
//! # Design
//! Every failure a call can hit maps to exactly one `ApiError` variant, and
//! nothing inside the core catches or retries: the error the facade returns is
//! the first one raised. `AuthRequired` gets a dedicated variant because it is
//! the one condition callers act on (redirect to login) rather than display.
//! Timeouts are kept apart from other network failures so callers can tell
//! them apart, but `is_network()` groups them together.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by the request pipeline.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// Connection, DNS or protocol failure, or a malformed response body.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The configured request deadline elapsed.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The server answered with a status outside 200-299.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// The response body was missing or not a JSON object/array.
    #[error("invalid response payload")]
    InvalidPayload,

    /// The backend reported the session as unauthorized. The stored
    /// credential has already been cleared when this is returned.
    #[error("authentication required")]
    AuthRequired,

    /// The backend reported a non-zero business error code.
    #[error("{message}")]
    BusinessError { code: Option<i64>, message: String },

    /// The final pipeline value could not be decoded into the requested type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("credential store error: {0}")]
    CredentialError(String),
}

impl ApiError {
    /// True for the error that should send the user back to the login flow.
    pub fn is_auth_required(&self) -> bool {
        matches!(self, ApiError::AuthRequired)
    }

    /// True for transport-level failures, including timeouts.
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::NetworkError(_) | ApiError::Timeout(_))
    }

    /// The HTTP status carried by an `HttpError`, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ApiError::HttpError { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for ApiError {
    fn from(err: toml::de::Error) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
