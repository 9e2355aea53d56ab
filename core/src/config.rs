//! Client configuration.
//!
//! `ClientConfig` is built once and never mutated. Per-request headers are
//! derived from it by `default_headers`, which returns a fresh list on every
//! call.
//!
//! ## Environment Variables
//! - `SPIKE_SECRET_KEY`: secret API key (required)
//! - `SPIKE_PUBLISHABLE_KEY`: publishable key
//! - `SPIKE_API_BASE_URL`: API root, defaults to [`DEFAULT_BASE_URL`]
//! - `SPIKE_TIMEOUT_SECS`: request timeout in seconds

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{ApiError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.spike.cc/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials and connection settings shared by every request.
#[derive(Clone)]
pub struct ClientConfig {
    secret_key: String,
    publishable_key: String,
    base_url: String,
    timeout: Duration,
    user_agent: String,
}

impl ClientConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            publishable_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("spike-api-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_publishable_key(mut self, key: impl Into<String>) -> Self {
        self.publishable_key = key.into();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if `SPIKE_SECRET_KEY` is missing or
    /// `SPIKE_TIMEOUT_SECS` is not a positive integer.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("SPIKE_SECRET_KEY")
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ApiError::Config("SPIKE_SECRET_KEY is not set".to_string()))?;

        let mut config = Self::new(secret_key);
        if let Some(key) = lookup("SPIKE_PUBLISHABLE_KEY") {
            config = config.with_publishable_key(key);
        }
        if let Some(url) = lookup("SPIKE_API_BASE_URL").filter(|url| !url.is_empty()) {
            config = config.with_base_url(&url);
        }
        if let Some(raw) = lookup("SPIKE_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ApiError::Config(format!("Invalid SPIKE_TIMEOUT_SECS: {raw}")))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn publishable_key(&self) -> &str {
        &self.publishable_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Basic credentials: the secret key as username, empty password.
    pub fn authorization(&self) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:", self.secret_key)))
    }

    /// Headers attached to every request.
    pub fn default_headers(&self) -> Vec<(String, String)> {
        vec![
            ("Accept".to_string(), "*/*".to_string()),
            ("Connection".to_string(), "close".to_string()),
            ("User-Agent".to_string(), self.user_agent.clone()),
            ("Authorization".to_string(), self.authorization()),
        ]
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("secret_key", &"<redacted>")
            .field("publishable_key", &self.publishable_key)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
