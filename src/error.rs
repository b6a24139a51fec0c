//! Error types for configuration, remote calls, uploads and display control.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while building the API configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {var} is not set")]
    MissingBaseUrl { var: String },

    #[error("invalid API base URL '{url}': expected http:// or https://")]
    InvalidBaseUrl { url: String },

    #[cfg(feature = "remote")]
    #[error("cannot build HTTP client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },
}

/// Errors from the remote parse and highlight endpoints.
#[derive(Debug, Error)]
pub enum FetchError {
    // Network failures
    #[cfg(feature = "remote")]
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    // Invalid responses
    #[error("{url} returned invalid JSON: {source}")]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{url} returned an unexpected body with {} error(s)", errors.len())]
    InvalidPayload {
        url: String,
        errors: Vec<PayloadError>,
    },
}

impl FetchError {
    /// True when the request never produced a usable HTTP answer.
    pub fn is_network(&self) -> bool {
        match self {
            #[cfg(feature = "remote")]
            FetchError::Network { .. } => true,
            FetchError::Status { .. } => true,
            _ => false,
        }
    }

    /// True when the server answered but the body was unusable.
    pub fn is_invalid_response(&self) -> bool {
        matches!(
            self,
            FetchError::InvalidJson { .. } | FetchError::InvalidPayload { .. }
        )
    }
}

/// Single mismatch between a response body and its expected shape.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PayloadError {
    /// JSON Pointer (RFC 6901) to the offending value.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Errors while taking in a schema file for upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{name} is {size} bytes, limit is {limit}")]
    TooLarge {
        name: String,
        size: usize,
        limit: usize,
    },

    #[error("{name} is not a .prisma file")]
    UnsupportedExtension { name: String },
}

/// Errors from display controls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError {
    #[error("no schema is being displayed")]
    NoSchema,

    #[error("unknown model '{id}'")]
    UnknownModel { id: String },
}
