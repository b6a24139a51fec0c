//! Display engine: renders the cached schema as a grid of model cards.
//!
//! The engine subscribes to the [`ResultCache`] when mounted and follows
//! every write to [`SCHEMA_CACHE_TAG`]. It owns the single
//! `Option<ActiveModel>` that decides which card, if any, is expanded.
//!
//! Every write resets the view: the active model is cleared and stored
//! highlights are dropped, since a fresh parse may reuse model ids for
//! different source. Highlight fetches still in flight at that point are
//! discarded when they settle.
//!
//! Code view can be driven in two steps: [`DisplayEngine::begin_code`]
//! switches the card and hands back the request to send, and
//! [`DisplayEngine::finish_code`] stores the reply. Until then the card
//! renders in code mode with no content.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info};

use crate::cache::{ResultCache, Subscription};
use crate::card::{mode_of, transition, CardControl, CardView, CardWidth, ModelCard};
use crate::error::{DisplayError, FetchError};
use crate::highlight::{CodeHighlightFetcher, PendingHighlight};
use crate::service::SchemaService;
use crate::types::{
    ActiveModel, DisplayMode, HighlightedCode, Model, SchemaResult, SCHEMA_CACHE_TAG,
};

#[derive(Debug, Default)]
struct EngineState {
    schema: Option<Rc<SchemaResult>>,
    active: Option<ActiveModel>,
}

/// Renders model cards for the most recent successful upload.
pub struct DisplayEngine<S> {
    state: Rc<RefCell<EngineState>>,
    highlights: CodeHighlightFetcher<S>,
    subscription: Option<Subscription>,
}

impl<S> fmt::Debug for DisplayEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayEngine")
            .field("state", &self.state.borrow())
            .field("mounted", &self.subscription.is_some())
            .finish()
    }
}

impl<S: SchemaService> DisplayEngine<S> {
    /// Subscribe to `cache` and start following schema uploads.
    ///
    /// Only writes made after mounting are observed.
    pub fn mount(cache: &ResultCache<SchemaResult>, service: S) -> Self {
        let state = Rc::new(RefCell::new(EngineState::default()));
        let highlights = CodeHighlightFetcher::new(service);

        let listener_state = Rc::clone(&state);
        let listener_highlights = highlights.cache().clone();
        let subscription = cache.subscribe(move |tag, entry| {
            if tag != SCHEMA_CACHE_TAG {
                return;
            }
            let mut state = listener_state.borrow_mut();
            state.active = None;
            listener_highlights.clear();
            state.schema = entry.value().cloned();
            match &state.schema {
                Some(schema) => info!(models = schema.result.len(), "displaying schema"),
                None => info!("upload failed, clearing display"),
            }
        });

        Self {
            state,
            highlights,
            subscription: Some(subscription),
        }
    }

    /// Unsubscribe from the cache. Dropping the engine does the same.
    pub fn teardown(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    /// Schema currently displayed, if any.
    pub fn schema(&self) -> Option<Rc<SchemaResult>> {
        self.state.borrow().schema.clone()
    }

    pub fn active_model(&self) -> Option<ActiveModel> {
        self.state.borrow().active.clone()
    }

    pub fn active_model_id(&self) -> Option<String> {
        self.state.borrow().active.as_ref().map(|a| a.id.clone())
    }

    /// Current mode of the card for `model_id`.
    pub fn mode_of(&self, model_id: &str) -> DisplayMode {
        mode_of(self.state.borrow().active.as_ref(), model_id)
    }

    /// Stored highlight for `model_id`, if one has been fetched.
    pub fn highlight(&self, model_id: &str) -> Option<Rc<str>> {
        self.highlights.cache().get(model_id)
    }

    pub fn collapse(&self, model_id: &str) -> Result<(), DisplayError> {
        self.apply(model_id, CardControl::Collapse)
    }

    pub fn show_table(&self, model_id: &str) -> Result<(), DisplayError> {
        self.apply(model_id, CardControl::Table)
    }

    /// Switch to code mode, fetching the highlight on first use.
    ///
    /// Blocks on the fetch. A failed fetch leaves the card in code mode with
    /// empty content.
    pub fn show_code(&self, model_id: &str) -> Result<(), DisplayError> {
        if let Some(pending) = self.begin_code(model_id)? {
            self.highlights.run(pending);
        }
        Ok(())
    }

    /// Switch to code mode and fetch the highlight again.
    pub fn refresh_code(&self, model_id: &str) -> Result<(), DisplayError> {
        let pending = self.begin_refresh(model_id)?;
        self.highlights.run(pending);
        Ok(())
    }

    /// Switch to code mode without fetching.
    ///
    /// Returns the request to send when no highlight is stored for the
    /// model; settle it with [`DisplayEngine::finish_code`].
    pub fn begin_code(&self, model_id: &str) -> Result<Option<PendingHighlight>, DisplayError> {
        let schema = self.schema().ok_or(DisplayError::NoSchema)?;
        let model = lookup(&schema, model_id)?;
        self.set_active(model_id, CardControl::Code);
        if self.highlights.cache().contains(model_id) {
            debug!(model = model_id, "highlight cache hit");
            return Ok(None);
        }
        Ok(Some(self.highlights.begin(model, &schema.schema)))
    }

    /// Like [`DisplayEngine::begin_code`] but always requests a fresh
    /// highlight. The stored one is dropped, so the card is empty until the
    /// new one arrives.
    pub fn begin_refresh(&self, model_id: &str) -> Result<PendingHighlight, DisplayError> {
        let schema = self.schema().ok_or(DisplayError::NoSchema)?;
        let model = lookup(&schema, model_id)?;
        self.set_active(model_id, CardControl::Code);
        self.highlights.cache().remove(model_id);
        Ok(self.highlights.begin(model, &schema.schema))
    }

    /// Store the reply for a fetch started with `begin_code`.
    ///
    /// Returns the stored HTML. Failures and replies for a schema that has
    /// since been replaced store nothing.
    pub fn finish_code(
        &self,
        pending: PendingHighlight,
        result: Result<HighlightedCode, FetchError>,
    ) -> Option<Rc<str>> {
        self.highlights.settle(pending, result)
    }

    /// Apply a card control. `Code` behaves like [`DisplayEngine::show_code`].
    ///
    /// # Errors
    ///
    /// Returns `DisplayError::NoSchema` when nothing is displayed and
    /// `DisplayError::UnknownModel` for ids not in the current schema.
    pub fn apply(&self, model_id: &str, control: CardControl) -> Result<(), DisplayError> {
        if control == CardControl::Code {
            return self.show_code(model_id);
        }
        let schema = self.schema().ok_or(DisplayError::NoSchema)?;
        lookup(&schema, model_id)?;
        self.set_active(model_id, control);
        Ok(())
    }

    /// Card views in server order, or `None` when no schema is displayed.
    pub fn render(&self) -> Option<Vec<CardView>> {
        let state = self.state.borrow();
        let schema = state.schema.as_ref()?;
        let active = state.active.as_ref();
        let views = schema
            .result
            .iter()
            .map(|model| {
                let highlight = self.highlights.cache().get(&model.id);
                ModelCard::new(model, mode_of(active, &model.id))
                    .with_highlight(highlight.as_deref())
                    .view(CardWidth::for_card(active, &model.id))
            })
            .collect();
        Some(views)
    }

    /// HTML for the whole grid; empty when no schema is displayed.
    pub fn render_html(&self) -> String {
        match self.render() {
            Some(cards) => {
                let body: String = cards.iter().map(CardView::to_html).collect();
                format!(r#"<div class="schema-grid">{}</div>"#, body)
            }
            None => String::new(),
        }
    }

    fn set_active(&self, model_id: &str, control: CardControl) {
        let mut state = self.state.borrow_mut();
        state.active = transition(state.active.take(), model_id, control);
        debug!(model = model_id, mode = %control.target(), active = ?state.active.as_ref().map(|a| &a.id), "card control");
    }
}

fn lookup<'a>(schema: &'a SchemaResult, model_id: &str) -> Result<&'a Model, DisplayError> {
    schema.model(model_id).ok_or_else(|| DisplayError::UnknownModel {
        id: model_id.to_string(),
    })
}
