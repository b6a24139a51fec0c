//! Schema Inspector
//!
//! Display state engine for Prisma schemas analysed by a remote service.
//!
//! An upload sends a schema file to the parse endpoint and stores the outcome
//! in a shared [`ResultCache`]. A [`DisplayEngine`] mounted on that cache
//! renders one card per returned model. Each card is collapsed, shown as a
//! field table, or shown as highlighted source fetched on demand; at most one
//! card is expanded at a time.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use schema_inspector::{
//!     DisplayEngine, DisplayMode, Outcome, ResultCache, SchemaResult, SCHEMA_CACHE_TAG,
//! };
//! # use schema_inspector::{CodeHighlightRequest, FetchError, HighlightedCode, SchemaFile, SchemaService};
//! # struct Offline;
//! # impl SchemaService for Offline {
//! #     fn visualise(&self, _: &SchemaFile) -> Result<SchemaResult, FetchError> { unreachable!() }
//! #     fn code_highlight(&self, _: &CodeHighlightRequest<'_>) -> Result<HighlightedCode, FetchError> { unreachable!() }
//! # }
//!
//! let cache = ResultCache::new();
//! let engine = DisplayEngine::mount(&cache, Offline);
//!
//! let parsed: SchemaResult = serde_json::from_str(r#"{
//!     "schema": "model User {id Int}",
//!     "result": [{
//!         "id": "m1", "name": "User", "span": {"start": 0, "end": 19},
//!         "fields": [{"name": "id", "type": "Int", "is_index": false, "constraints": [],
//!                     "relation_ship_fields": [], "relation_ship_references": []}],
//!         "code": "model User {id Int}"
//!     }]
//! }"#).unwrap();
//! cache.write(SCHEMA_CACHE_TAG, Outcome::Success(Rc::new(parsed)));
//!
//! engine.show_table("m1").unwrap();
//! assert_eq!(engine.mode_of("m1"), DisplayMode::Table);
//! assert!(engine.render_html().contains("<td>Int</td>"));
//! ```
//!
//! # Card Controls
//!
//! | Control | Card mode | Other cards |
//! |---------|-----------|-------------|
//! | collapse | `collapsed` | unchanged |
//! | table | `table` | collapsed |
//! | code | `code` (highlight fetched once) | collapsed |

mod cache;
mod card;
mod config;
mod engine;
mod error;
mod highlight;
mod sanitize;
mod service;
mod session;
mod types;
mod upload;
mod wire;

pub use cache::{CacheEntry, CacheStatus, Outcome, ResultCache, Subscription};
pub use card::{
    mode_of, transition, CardBody, CardControl, CardView, CardWidth, FieldRow, ModelCard,
};
pub use config::{ApiConfig, API_BASE_ENV, DEFAULT_TIMEOUT};
pub use engine::DisplayEngine;
pub use error::{ConfigError, DisplayError, FetchError, PayloadError, UploadError};
pub use highlight::{CodeHighlightFetcher, HighlightCache, PendingHighlight};
pub use sanitize::{escape_text, sanitize_html};
pub use service::SchemaService;
pub use session::Session;
pub use types::{
    ActiveModel, CodeHighlightRequest, CodeHighlightResponse, DisplayMode, Field, HighlightedCode,
    Model, SchemaResult, Span, COLLAPSED_PREVIEW_FIELDS, MAX_SCHEMA_BYTES, SCHEMA_CACHE_TAG,
    SCHEMA_FIELD_NAME, SCHEMA_FILE_EXTENSION,
};
pub use upload::{PendingUpload, SchemaFile, UploadAffordance, UploadController};
pub use wire::{code_highlight_schema, decode_body, schema_result_schema, validate_payload};

#[cfg(feature = "remote")]
pub use service::HttpSchemaService;
