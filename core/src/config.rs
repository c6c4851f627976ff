//! Client configuration.
//!
//! Defaults target BrasilAPI. Values can be overlaid from the environment or
//! loaded from a TOML document; every key is optional in both.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::ResponseSchema;

pub const DEFAULT_BASE_URL: &str = "https://brasilapi.com.br/api/cep/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    /// Whole-request timeout. `None` leaves it to the transport.
    pub timeout_ms: Option<u64>,
    pub schema: ResponseSchema,
    pub error_display: ErrorDisplayConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: None,
            schema: ResponseSchema::default(),
            error_display: ErrorDisplayConfig::default(),
        }
    }
}

/// Where and how the inline error element is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorDisplayConfig {
    pub element_id: String,
    pub css_class: String,
    /// The CEP input the element is inserted after.
    pub anchor_id: String,
    pub hide_after_ms: u64,
}

impl Default for ErrorDisplayConfig {
    fn default() -> Self {
        Self {
            element_id: "cep-error".to_string(),
            css_class: "cep-error".to_string(),
            anchor_id: "cep".to_string(),
            hide_after_ms: 5_000,
        }
    }
}

impl ErrorDisplayConfig {
    pub fn hide_after(&self) -> Duration {
        Duration::from_millis(self.hide_after_ms)
    }
}

impl ClientConfig {
    /// Defaults overlaid with `CEP_API_BASE_URL`, `CEP_API_TIMEOUT_MS` and
    /// `CEP_ERROR_HIDE_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|key| env::var(key).ok())
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Base URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(url) = lookup("CEP_API_BASE_URL") {
            self.base_url = url;
        }
        if let Some(raw) = lookup("CEP_API_TIMEOUT_MS") {
            self.timeout_ms = Some(parse_millis("CEP_API_TIMEOUT_MS", &raw)?);
        }
        if let Some(raw) = lookup("CEP_ERROR_HIDE_MS") {
            self.error_display.hide_after_ms = parse_millis("CEP_ERROR_HIDE_MS", &raw)?;
        }
        Ok(self)
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        key: key.to_string(),
        message: e.to_string(),
    })
}
