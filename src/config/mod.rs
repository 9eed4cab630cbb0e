//! Transport configuration: builder, environment variables, or a TOML file.

use std::path::Path;
use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Default cap on a single SSE line, in bytes.
pub const DEFAULT_MAX_TOKEN_SIZE: usize = 64 * 1024;

/// Default connect timeout for the built-in HTTP backend.
pub const DEFAULT_DIAL_TIMEOUT_MS: u64 = 10_000;

/// Transport settings.
///
/// Example:
/// ```
/// use streamrpc::config::TransportConfig;
///
/// let config = TransportConfig::builder()
///     .max_token_size(1024 * 1024)
///     .dial_timeout_ms(2_000)
///     .build();
/// assert_eq!(config.effective_max_token_size(), 1024 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Maximum SSE token size in bytes; unset or zero means 64 KiB.
    pub max_token_size: Option<usize>,
    #[builder(default = DEFAULT_DIAL_TIMEOUT_MS)]
    pub dial_timeout_ms: u64,
    /// Whole-request timeout for the default backend. Unset by default since
    /// event streams are long-lived.
    pub request_timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_token_size: None,
            dial_timeout_ms: DEFAULT_DIAL_TIMEOUT_MS,
            request_timeout_ms: None,
            user_agent: None,
        }
    }
}

impl TransportConfig {
    /// Load from environment variables (`STREAMRPC_*`), reading `.env` first.
    pub fn from_env() -> Result<Self, TransportError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TransportError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("STREAMRPC_MAX_TOKEN_SIZE") {
            config.max_token_size = Some(parse_number("STREAMRPC_MAX_TOKEN_SIZE", &raw)?);
        }
        if let Some(raw) = lookup("STREAMRPC_DIAL_TIMEOUT_MS") {
            config.dial_timeout_ms = parse_number("STREAMRPC_DIAL_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("STREAMRPC_REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = Some(parse_number("STREAMRPC_REQUEST_TIMEOUT_MS", &raw)?);
        }
        if let Some(agent) = lookup("STREAMRPC_USER_AGENT") {
            if !agent.trim().is_empty() {
                config.user_agent = Some(agent);
            }
        }

        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, TransportError> {
        toml::from_str(raw)
            .map_err(|e| TransportError::Configuration(format!("invalid transport config: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TransportError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn effective_max_token_size(&self) -> usize {
        match self.max_token_size {
            Some(size) if size > 0 => size,
            _ => DEFAULT_MAX_TOKEN_SIZE,
        }
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, TransportError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| TransportError::Configuration(format!("{key}={raw:?}: {e}")))
}
