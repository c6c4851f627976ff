//! Error types for the CEP lookup client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers treat "this CEP does
//! not exist" differently from "the service is unhealthy." All other non-2xx
//! responses land in `Service` with the raw status code and body. Errors are
//! never translated between kinds on their way up: whatever `lookup` detects
//! is exactly what the caller, and any failure callback, receives.

use thiserror::Error;

/// Errors returned by `CepClient` operations.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The input does not contain exactly eight digits. Raised before any
    /// request is issued.
    #[error("invalid CEP {input:?}: expected 8 digits")]
    Validation { input: String },

    /// The service answered 404.
    #[error("CEP not found")]
    NotFound,

    /// The service answered with a non-2xx status other than 404.
    #[error("CEP service returned HTTP {status}")]
    Service { status: u16, body: String },

    /// No response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A 2xx response whose body is not a JSON object.
    #[error("could not decode address: {0}")]
    Deserialization(String),
}

impl LookupError {
    /// HTTP status associated with the failure, if the service answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            LookupError::NotFound => Some(404),
            LookupError::Service { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Network-level failure reported by a `Transport`.
#[derive(Debug, Error)]
#[error("request failed: {message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying I/O or client error, keeping it reachable through
    /// `Error::source`.
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors raised while loading `ClientConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}
