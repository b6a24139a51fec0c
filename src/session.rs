//! One inspector page: cache, upload controller and display engine wired to
//! a shared service.

use std::rc::Rc;

use crate::cache::ResultCache;
use crate::engine::DisplayEngine;
use crate::service::SchemaService;
use crate::types::SchemaResult;
use crate::upload::{SchemaFile, UploadAffordance, UploadController};

#[cfg(feature = "remote")]
use crate::config::ApiConfig;
#[cfg(feature = "remote")]
use crate::error::ConfigError;
#[cfg(feature = "remote")]
use crate::service::HttpSchemaService;

/// Upload side and display side of one page, sharing a result cache.
#[derive(Debug)]
pub struct Session<S> {
    service: Rc<S>,
    cache: ResultCache<SchemaResult>,
    uploads: UploadController<Rc<S>>,
    display: DisplayEngine<Rc<S>>,
}

impl<S: SchemaService> Session<S> {
    pub fn new(service: S) -> Self {
        let service = Rc::new(service);
        let cache = ResultCache::new();
        let display = DisplayEngine::mount(&cache, Rc::clone(&service));
        let uploads = UploadController::new(Rc::clone(&service), cache.clone());
        Self {
            service,
            cache,
            uploads,
            display,
        }
    }

    pub fn upload(&self, file: &SchemaFile) {
        self.uploads.upload(file);
    }

    pub fn affordance(&self) -> UploadAffordance {
        self.uploads.affordance()
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn uploads(&self) -> &UploadController<Rc<S>> {
        &self.uploads
    }

    pub fn display(&self) -> &DisplayEngine<Rc<S>> {
        &self.display
    }

    pub fn cache(&self) -> &ResultCache<SchemaResult> {
        &self.cache
    }
}

#[cfg(feature = "remote")]
impl Session<HttpSchemaService> {
    /// Session against the service at `config`.
    pub fn connect(config: ApiConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(HttpSchemaService::new(config)?))
    }

    /// Session against the service named by `PRISMA_API_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::connect(ApiConfig::from_env()?)
    }
}
