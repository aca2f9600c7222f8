//! Error types and handling for Helios
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting. The feed-facing
//! variants (`Auth`, `Network`, `Malformed`, `Api`) double as the failure
//! classification for the Enever client: invalid token, cannot connect,
//! unparseable response, remote-side error.

use thiserror::Error;

/// Result type alias for Helios operations
pub type Result<T> = std::result::Result<T, HeliosError>;

/// Main error type for Helios
#[derive(Debug, Error)]
pub enum HeliosError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The API token was rejected by the remote endpoint
    #[error("Invalid API token: {message}")]
    Auth { message: String },

    /// Connectivity failures, including transport timeouts
    #[error("Cannot connect: {message}")]
    Network { message: String },

    /// A response that could not be parsed into feed data
    #[error("Malformed response: {message}")]
    Malformed { message: String },

    /// Remote API errors (non-200 status, error payloads)
    #[error("API error: {message}")]
    Api { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// HTTP/Web server errors
    #[error("Web server error: {message}")]
    Web { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl HeliosError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        HeliosError::Config {
            message: message.into(),
        }
    }

    /// Create a new invalid-token error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        HeliosError::Auth {
            message: message.into(),
        }
    }

    /// Create a new connectivity error
    pub fn network<S: Into<String>>(message: S) -> Self {
        HeliosError::Network {
            message: message.into(),
        }
    }

    /// Create a new malformed-response error
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        HeliosError::Malformed {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        HeliosError::Api {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        HeliosError::Io {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        HeliosError::Web {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        HeliosError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        HeliosError::Generic {
            message: message.into(),
        }
    }

    /// Whether retrying on the next eligible tick can reasonably help.
    ///
    /// Invalid tokens are retried as well (credentials may be rotated
    /// externally), but callers log them more loudly.
    pub fn is_transient(&self) -> bool {
        !matches!(self, HeliosError::Auth { .. })
    }
}

impl From<std::io::Error> for HeliosError {
    fn from(err: std::io::Error) -> Self {
        HeliosError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for HeliosError {
    fn from(err: serde_yaml::Error) -> Self {
        HeliosError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for HeliosError {
    fn from(err: serde_json::Error) -> Self {
        HeliosError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for HeliosError {
    fn from(err: reqwest::Error) -> Self {
        // Timeouts count as connectivity failures, not generic API errors
        if err.is_timeout() || err.is_connect() {
            HeliosError::network(err.to_string())
        } else if err.is_decode() {
            HeliosError::malformed(err.to_string())
        } else {
            HeliosError::api(err.to_string())
        }
    }
}

impl From<chrono::ParseError> for HeliosError {
    fn from(err: chrono::ParseError) -> Self {
        HeliosError::validation("datetime", &err.to_string())
    }
}
