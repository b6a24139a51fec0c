//! Schema file intake and the upload/parse operation.
//!
//! The controller never reports failure to its caller: every settled upload
//! ends up as an entry in the shared [`ResultCache`] under
//! [`SCHEMA_CACHE_TAG`], and that entry is the only thing readers observe.

use std::path::Path;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::cache::{CacheStatus, Outcome, ResultCache};
use crate::error::{FetchError, UploadError};
use crate::service::SchemaService;
use crate::types::{SchemaResult, MAX_SCHEMA_BYTES, SCHEMA_CACHE_TAG, SCHEMA_FILE_EXTENSION};

/// A schema file picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFile {
    name: String,
    contents: Vec<u8>,
}

impl SchemaFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Read a schema file from disk.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Read` if the file cannot be read.
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let contents = std::fs::read(path).map_err(|source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, contents })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// Apply the drop-zone limits: `.prisma` extension, at most 3 MiB.
    pub fn check(&self) -> Result<(), UploadError> {
        let extension = Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(SCHEMA_FILE_EXTENSION))
            .unwrap_or(false);
        if !extension {
            return Err(UploadError::UnsupportedExtension {
                name: self.name.clone(),
            });
        }
        if self.contents.len() > MAX_SCHEMA_BYTES {
            return Err(UploadError::TooLarge {
                name: self.name.clone(),
                size: self.contents.len(),
                limit: MAX_SCHEMA_BYTES,
            });
        }
        Ok(())
    }
}

/// What the upload area should offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadAffordance {
    /// No schema yet: show the drop target.
    DropZone,
    /// A schema is displayed: show an "upload another" button.
    UploadAnother,
}

/// Ticket for an upload that has been started but not settled.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an unfinished upload never reaches the cache"]
pub struct PendingUpload {
    sequence: u64,
}

impl PendingUpload {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Runs the remote parse and records its outcome in the cache.
#[derive(Debug)]
pub struct UploadController<S> {
    service: S,
    cache: ResultCache<SchemaResult>,
}

impl<S: SchemaService> UploadController<S> {
    pub fn new(service: S, cache: ResultCache<SchemaResult>) -> Self {
        Self { service, cache }
    }

    pub fn cache(&self) -> &ResultCache<SchemaResult> {
        &self.cache
    }

    /// Upload a file and record the outcome.
    ///
    /// Files rejected by [`SchemaFile::check`] are logged and never sent;
    /// the cache is left untouched.
    pub fn upload(&self, file: &SchemaFile) {
        if let Err(e) = file.check() {
            warn!(file = file.name(), error = %e, "rejected schema file");
            return;
        }
        let pending = self.begin();
        info!(file = file.name(), sequence = pending.sequence, "uploading schema");
        let result = self.service.visualise(file);
        self.finish(pending, result);
    }

    /// Mark a new upload as in flight, superseding any earlier one.
    pub fn begin(&self) -> PendingUpload {
        PendingUpload {
            sequence: self.cache.begin(SCHEMA_CACHE_TAG),
        }
    }

    /// Settle an upload. Results of superseded uploads are discarded.
    ///
    /// Returns `true` when the outcome was stored.
    pub fn finish(&self, pending: PendingUpload, result: Result<SchemaResult, FetchError>) -> bool {
        let outcome = match result {
            Ok(schema) => {
                debug!(models = schema.result.len(), "schema parsed");
                Outcome::Success(Rc::new(schema))
            }
            Err(e) => {
                warn!(error = %e, "schema upload failed");
                Outcome::Failure(e.to_string())
            }
        };
        let stored = self
            .cache
            .write_sequenced(SCHEMA_CACHE_TAG, pending.sequence, outcome);
        if !stored {
            info!(sequence = pending.sequence, "upload superseded, result discarded");
        }
        stored
    }

    /// Drop target until a schema has been parsed, then "upload another".
    pub fn affordance(&self) -> UploadAffordance {
        match self.cache.read(SCHEMA_CACHE_TAG) {
            Some(entry) if entry.status() == CacheStatus::Success => {
                UploadAffordance::UploadAnother
            }
            _ => UploadAffordance::DropZone,
        }
    }
}
