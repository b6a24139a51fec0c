//! Lazy per-model code highlighting.
//!
//! A fetch is split in two, like an upload: [`CodeHighlightFetcher::begin`]
//! issues a [`PendingHighlight`] carrying the request, and
//! [`CodeHighlightFetcher::settle`] stores its result once the caller has one.
//! Clearing the cache invalidates every outstanding ticket, so a highlight
//! for a schema that has since been replaced is dropped.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::sanitize::sanitize_html;
use crate::service::SchemaService;
use crate::error::FetchError;
use crate::types::{CodeHighlightRequest, HighlightedCode, Model, Span};

/// Sanitized highlight HTML keyed by model id.
///
/// Cloning yields another handle to the same entries.
#[derive(Debug, Clone, Default)]
pub struct HighlightCache {
    entries: Rc<RefCell<HashMap<String, Rc<str>>>>,
    generation: Rc<Cell<u64>>,
}

impl HighlightCache {
    pub fn get(&self, model_id: &str) -> Option<Rc<str>> {
        self.entries.borrow().get(model_id).cloned()
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.entries.borrow().contains_key(model_id)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Drop every entry and invalidate outstanding fetches.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
        self.generation.set(self.generation.get() + 1);
    }

    pub fn remove(&self, model_id: &str) -> Option<Rc<str>> {
        self.entries.borrow_mut().remove(model_id)
    }

    fn insert(&self, model_id: &str, html: Rc<str>) {
        self.entries.borrow_mut().insert(model_id.to_string(), html);
    }
}

/// An in-flight highlight request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an unsettled highlight never reaches the cache"]
pub struct PendingHighlight {
    model_id: String,
    span: Span,
    schema: Rc<str>,
    generation: u64,
}

impl PendingHighlight {
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Request body to send to the highlight endpoint.
    pub fn request(&self) -> CodeHighlightRequest<'_> {
        CodeHighlightRequest {
            span: self.span,
            schema: &self.schema,
        }
    }
}

/// Fetches highlighted source for one model at a time.
///
/// A successful fetch is stored by model id and never repeated unless
/// [`CodeHighlightFetcher::refetch`] is used. Failures are logged and leave
/// no entry, so the next request tries again.
#[derive(Debug)]
pub struct CodeHighlightFetcher<S> {
    service: S,
    cache: HighlightCache,
}

impl<S: SchemaService> CodeHighlightFetcher<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            cache: HighlightCache::default(),
        }
    }

    pub fn cache(&self) -> &HighlightCache {
        &self.cache
    }

    /// Highlight for `model`, fetching it on the first request.
    pub fn fetch(&self, model: &Model, schema: &str) -> Option<Rc<str>> {
        if let Some(html) = self.cache.get(&model.id) {
            debug!(model = %model.id, "highlight cache hit");
            return Some(html);
        }
        self.run(self.begin(model, schema))
    }

    /// Fetch the highlight again.
    ///
    /// The stored entry is dropped first, so a failed refetch leaves none.
    pub fn refetch(&self, model: &Model, schema: &str) -> Option<Rc<str>> {
        self.cache.remove(&model.id);
        self.run(self.begin(model, schema))
    }

    /// Start a fetch without sending it.
    pub fn begin(&self, model: &Model, schema: &str) -> PendingHighlight {
        PendingHighlight {
            model_id: model.id.clone(),
            span: model.span,
            schema: schema.into(),
            generation: self.cache.generation.get(),
        }
    }

    /// Send a pending request through the service and settle it.
    pub fn run(&self, pending: PendingHighlight) -> Option<Rc<str>> {
        debug!(model = %pending.model_id, start = pending.span.start, end = pending.span.end, "fetching highlight");
        let result = self.service.code_highlight(&pending.request());
        self.settle(pending, result)
    }

    /// Store the result of a pending fetch.
    ///
    /// Returns the sanitized HTML when it was stored. Failures are logged and
    /// leave no entry; results for an invalidated ticket are discarded.
    pub fn settle(
        &self,
        pending: PendingHighlight,
        result: Result<HighlightedCode, FetchError>,
    ) -> Option<Rc<str>> {
        if pending.generation != self.cache.generation.get() {
            debug!(model = %pending.model_id, "schema replaced, highlight discarded");
            return None;
        }
        match result {
            Ok(code) => {
                let html: Rc<str> = sanitize_html(&code.html).into();
                self.cache.insert(&pending.model_id, Rc::clone(&html));
                Some(html)
            }
            Err(e) => {
                warn!(model = %pending.model_id, error = %e, "code highlight failed");
                None
            }
        }
    }
}
