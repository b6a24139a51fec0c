//! Remote schema analysis service.
//!
//! [`SchemaService`] is the seam between the display engine and the network.
//! [`HttpSchemaService`] talks to the real endpoints; tests substitute their
//! own implementations.

use std::rc::Rc;

use crate::error::FetchError;
use crate::types::{CodeHighlightRequest, HighlightedCode, SchemaResult};
use crate::upload::SchemaFile;

#[cfg(feature = "remote")]
use crate::config::ApiConfig;
#[cfg(feature = "remote")]
use crate::error::ConfigError;
#[cfg(feature = "remote")]
use crate::types::{CodeHighlightResponse, SCHEMA_FIELD_NAME};
#[cfg(feature = "remote")]
use crate::wire::{code_highlight_schema, decode_body, schema_result_schema};

/// The two operations offered by the analysis service.
pub trait SchemaService {
    /// Parse an uploaded schema file into its models.
    fn visualise(&self, file: &SchemaFile) -> Result<SchemaResult, FetchError>;

    /// Render one model's source slice as highlighted HTML.
    fn code_highlight(&self, request: &CodeHighlightRequest<'_>)
        -> Result<HighlightedCode, FetchError>;
}

impl<S: SchemaService + ?Sized> SchemaService for Rc<S> {
    fn visualise(&self, file: &SchemaFile) -> Result<SchemaResult, FetchError> {
        (**self).visualise(file)
    }

    fn code_highlight(
        &self,
        request: &CodeHighlightRequest<'_>,
    ) -> Result<HighlightedCode, FetchError> {
        (**self).code_highlight(request)
    }
}

impl<S: SchemaService + ?Sized> SchemaService for &S {
    fn visualise(&self, file: &SchemaFile) -> Result<SchemaResult, FetchError> {
        (**self).visualise(file)
    }

    fn code_highlight(
        &self,
        request: &CodeHighlightRequest<'_>,
    ) -> Result<HighlightedCode, FetchError> {
        (**self).code_highlight(request)
    }
}

/// Blocking HTTP client for the analysis service.
///
/// Requires the `remote` feature (enabled by default).
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct HttpSchemaService {
    client: reqwest::blocking::Client,
    config: ApiConfig,
}

#[cfg(feature = "remote")]
impl HttpSchemaService {
    /// Build a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Client` if the HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, ConfigError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|source| ConfigError::Client { source })?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Send a prepared request and return the body of a 2xx answer.
    fn send(url: &str, request: reqwest::blocking::RequestBuilder) -> Result<String, FetchError> {
        let response = request.send().map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;

        // Check for HTTP errors before reading the body
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })
    }
}

#[cfg(feature = "remote")]
impl SchemaService for HttpSchemaService {
    fn visualise(&self, file: &SchemaFile) -> Result<SchemaResult, FetchError> {
        let url = self.config.visualise_url();
        let part = reqwest::blocking::multipart::Part::bytes(file.contents().to_vec())
            .file_name(file.name().to_string());
        let form = reqwest::blocking::multipart::Form::new().part(SCHEMA_FIELD_NAME, part);

        let request = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "*/*")
            .multipart(form);
        let body = Self::send(&url, request)?;
        decode_body(&url, &body, &schema_result_schema())
    }

    fn code_highlight(
        &self,
        request: &CodeHighlightRequest<'_>,
    ) -> Result<HighlightedCode, FetchError> {
        let url = self.config.code_highlight_url();
        let body = Self::send(&url, self.client.post(&url).json(request))?;
        let response: CodeHighlightResponse = decode_body(&url, &body, &code_highlight_schema())?;
        Ok(response.code)
    }
}
