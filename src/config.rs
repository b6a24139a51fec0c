//! API endpoint configuration.

use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable holding the parse/highlight service origin.
pub const API_BASE_ENV: &str = "PRISMA_API_URL";

/// Default timeout for HTTP requests (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const VISUALISE_PATH: &str = "/api/v1/visualise";
const CODE_HIGHLIGHT_PATH: &str = "/api/v1/code_highlight";

/// Location of the remote analysis service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: String,
    timeout: Duration,
}

impl ApiConfig {
    /// Create a config for the given service origin.
    ///
    /// A trailing slash is dropped so endpoint paths join cleanly.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` unless the URL is http(s).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = base_url.into();
        let trimmed = base_url.trim().trim_end_matches('/');
        if !is_url(trimmed) {
            return Err(ConfigError::InvalidBaseUrl { url: base_url });
        }
        Ok(Self {
            base_url: trimmed.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Read the service origin from `PRISMA_API_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ApiConfig::from_env`] but with a custom variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(API_BASE_ENV) {
            Some(url) if !url.trim().is_empty() => Self::new(url),
            _ => Err(ConfigError::MissingBaseUrl {
                var: API_BASE_ENV.to_string(),
            }),
        }
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn visualise_url(&self) -> String {
        format!("{}{}", self.base_url, VISUALISE_PATH)
    }

    pub fn code_highlight_url(&self) -> String {
        format!("{}{}", self.base_url, CODE_HIGHLIGHT_PATH)
    }
}

/// Check if a string looks like a URL (starts with http:// or https://).
fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}
