//! Model card view-state machine and rendering.
//!
//! A card is in one of three modes: collapsed (the initial state), table or
//! code. The mode of every card is derived from one shared
//! `Option<ActiveModel>`: a card is collapsed unless it is the active one, so
//! activating a card collapses whichever card was active before.
//!
//! | Control    | Effect on the active model                      |
//! |------------|-------------------------------------------------|
//! | collapse   | cleared if this card is active, else unchanged  |
//! | table      | this card, in table mode                        |
//! | code       | this card, in code mode                         |

use std::fmt::Write;

use crate::sanitize::escape_text;
use crate::types::{ActiveModel, DisplayMode, Field, Model, COLLAPSED_PREVIEW_FIELDS};

/// User controls on a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardControl {
    Collapse,
    Table,
    Code,
}

impl CardControl {
    pub const ALL: [CardControl; 3] = [CardControl::Collapse, CardControl::Table, CardControl::Code];

    /// Mode the card enters when this control is used.
    pub fn target(&self) -> DisplayMode {
        match self {
            CardControl::Collapse => DisplayMode::Collapsed,
            CardControl::Table => DisplayMode::Table,
            CardControl::Code => DisplayMode::Code,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            CardControl::Collapse => "Collapse",
            CardControl::Table => "Table",
            CardControl::Code => "Code",
        }
    }
}

/// Apply `control` on card `id` to the shared active-model state.
pub fn transition(
    active: Option<ActiveModel>,
    id: &str,
    control: CardControl,
) -> Option<ActiveModel> {
    match control.target() {
        DisplayMode::Collapsed => active.filter(|a| a.id != id),
        mode => Some(ActiveModel {
            id: id.to_string(),
            mode,
        }),
    }
}

/// Mode of card `id` given the shared active-model state.
pub fn mode_of(active: Option<&ActiveModel>, id: &str) -> DisplayMode {
    match active {
        Some(a) if a.id == id => a.mode,
        _ => DisplayMode::Collapsed,
    }
}

/// Layout hint for a card in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardWidth {
    Wide,
    Narrow,
}

impl CardWidth {
    pub fn for_card(active: Option<&ActiveModel>, id: &str) -> Self {
        match active {
            Some(a) if a.id == id => CardWidth::Wide,
            _ => CardWidth::Narrow,
        }
    }

    /// Columns taken in a 12-column grid.
    pub fn span(&self) -> u8 {
        match self {
            CardWidth::Wide => 6,
            CardWidth::Narrow => 2,
        }
    }
}

/// One row of the table view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRow {
    pub name: String,
    pub field_type: String,
    pub constraints: Vec<String>,
    pub relation_fields: Vec<String>,
    pub relation_references: Vec<String>,
    /// Rendered as `true` or `false` in the Is_Index column.
    pub is_index: bool,
    /// Type column is emphasized for relation fields.
    pub emphasized: bool,
}

impl From<&Field> for FieldRow {
    fn from(field: &Field) -> Self {
        Self {
            name: field.name.clone(),
            field_type: field.field_type.clone(),
            constraints: field.constraints.clone(),
            relation_fields: field.relation_ship_fields.clone(),
            relation_references: field.relation_ship_references.clone(),
            is_index: field.is_index,
            emphasized: field.is_relation(),
        }
    }
}

/// Body of a card, per display mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardBody {
    /// Leading field names; an ellipsis row always follows.
    Collapsed { preview: Vec<String> },
    Table { rows: Vec<FieldRow> },
    /// Sanitized highlight HTML, `None` until a fetch succeeds.
    Code { html: Option<String> },
}

/// Fully resolved view of one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub id: String,
    pub name: String,
    pub mode: DisplayMode,
    pub width: CardWidth,
    pub body: CardBody,
}

/// A model paired with its current mode and highlight.
#[derive(Debug, Clone, Copy)]
pub struct ModelCard<'a> {
    model: &'a Model,
    mode: DisplayMode,
    highlight: Option<&'a str>,
}

impl<'a> ModelCard<'a> {
    pub fn new(model: &'a Model, mode: DisplayMode) -> Self {
        Self {
            model,
            mode,
            highlight: None,
        }
    }

    /// Attach already-sanitized highlight HTML.
    pub fn with_highlight(mut self, html: Option<&'a str>) -> Self {
        self.highlight = html;
        self
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn view(&self, width: CardWidth) -> CardView {
        let body = match self.mode {
            DisplayMode::Collapsed => CardBody::Collapsed {
                preview: self
                    .model
                    .fields
                    .iter()
                    .take(COLLAPSED_PREVIEW_FIELDS)
                    .map(|f| f.name.clone())
                    .collect(),
            },
            DisplayMode::Table => CardBody::Table {
                rows: self.model.fields.iter().map(FieldRow::from).collect(),
            },
            DisplayMode::Code => CardBody::Code {
                html: self.highlight.map(str::to_string),
            },
        };
        CardView {
            id: self.model.id.clone(),
            name: self.model.name.clone(),
            mode: self.mode,
            width,
            body,
        }
    }
}

impl CardView {
    /// Render the card as an HTML fragment.
    ///
    /// Text from the schema is escaped; code HTML is inserted as is and must
    /// already be sanitized.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        let width = match self.width {
            CardWidth::Wide => "wide",
            CardWidth::Narrow => "narrow",
        };
        let _ = write!(
            out,
            r#"<div class="model-card model-card--{}" data-model-id="{}" data-mode="{}" data-span="{}">"#,
            width,
            escape_text(&self.id),
            self.mode,
            self.width.span()
        );
        let _ = write!(
            out,
            r#"<div class="model-caption">{}</div>"#,
            escape_text(&self.name)
        );

        match &self.body {
            CardBody::Collapsed { preview } => {
                out.push_str(r#"<div class="model-preview">"#);
                for name in preview {
                    let _ = write!(out, r#"<div class="preview-row">{}</div>"#, escape_text(name));
                }
                out.push_str(r#"<div class="preview-row">...</div></div>"#);
            }
            CardBody::Table { rows } => {
                out.push_str(r#"<table class="model-fields"><thead><tr>"#);
                for header in [
                    "Field name",
                    "Type",
                    "Constraints",
                    "Relationship Field",
                    "Relationship Reference",
                    "Is_Index",
                ] {
                    let _ = write!(out, "<th>{}</th>", header);
                }
                out.push_str("</tr></thead><tbody>");
                for row in rows {
                    render_row(&mut out, row);
                }
                out.push_str("</tbody></table>");
            }
            CardBody::Code { html } => {
                let _ = write!(
                    out,
                    r#"<div class="model-code">{}</div>"#,
                    html.as_deref().unwrap_or("")
                );
            }
        }

        out.push_str(r#"<div class="model-controls">"#);
        for control in CardControl::ALL {
            let class = if control.target() == self.mode {
                " active"
            } else {
                ""
            };
            let _ = write!(
                out,
                r#"<button class="control{}" data-action="{}">{}</button>"#,
                class,
                control.target(),
                control.label()
            );
        }
        out.push_str("</div></div>");
        out
    }
}

fn render_row(out: &mut String, row: &FieldRow) {
    let type_class = if row.emphasized {
        r#" class="relation-type""#
    } else {
        ""
    };
    let _ = write!(
        out,
        "<tr><td>{}</td><td{}>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
        escape_text(&row.name),
        type_class,
        escape_text(&row.field_type),
        lines(&row.constraints),
        lines(&row.relation_fields),
        lines(&row.relation_references),
        row.is_index
    );
}

/// One `<div>` per entry so each value sits on its own line.
fn lines(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("<div>{}</div>", escape_text(v)))
        .collect()
}
