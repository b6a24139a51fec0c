//! Core types shared by the upload, cache and display layers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cache tag under which the upload/parse outcome is stored.
pub const SCHEMA_CACHE_TAG: &str = "schema_cache";

/// Multipart field name carrying the uploaded schema file.
pub const SCHEMA_FIELD_NAME: &str = "schema";

/// File extension accepted for uploads.
pub const SCHEMA_FILE_EXTENSION: &str = "prisma";

/// Largest schema file accepted for upload (3 MiB).
pub const MAX_SCHEMA_BYTES: usize = 3 * 1024 * 1024;

/// Number of field names shown in a collapsed card.
pub const COLLAPSED_PREVIEW_FIELDS: usize = 3;

/// Source-offset range of a model inside the schema text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// One attribute of a model, as returned by the parse service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub is_index: bool,
    pub constraints: Vec<String>,
    pub relation_ship_fields: Vec<String>,
    pub relation_ship_references: Vec<String>,
}

impl Field {
    /// True when the field takes part in a relation on either side.
    pub fn is_relation(&self) -> bool {
        !self.relation_ship_fields.is_empty() || !self.relation_ship_references.is_empty()
    }
}

/// One schema entity with its fields and source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub name: String,
    pub span: Span,
    pub fields: Vec<Field>,
    pub code: String,
}

/// Parse service result: the schema text and its models in server order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaResult {
    pub schema: String,
    pub result: Vec<Model>,
}

impl SchemaResult {
    /// Look up a model by id.
    pub fn model(&self, id: &str) -> Option<&Model> {
        self.result.iter().find(|m| m.id == id)
    }
}

/// Request body for the code highlight endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeHighlightRequest<'a> {
    pub span: Span,
    pub schema: &'a str,
}

/// Response body of the code highlight endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CodeHighlightResponse {
    pub code: HighlightedCode,
}

/// Pre-rendered HTML for one model's source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HighlightedCode {
    pub html: String,
}

/// How a single model card is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Collapsed,
    Table,
    Code,
}

impl DisplayMode {
    /// True for the modes that make a card the active one.
    pub fn is_expanded(&self) -> bool {
        !matches!(self, DisplayMode::Collapsed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Collapsed => "collapsed",
            DisplayMode::Table => "table",
            DisplayMode::Code => "code",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single model currently shown in a non-collapsed mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveModel {
    pub id: String,
    pub mode: DisplayMode,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(fields: &[&str], references: &[&str]) -> Field {
        Field {
            name: "author".into(),
            field_type: "User".into(),
            is_index: false,
            constraints: vec![],
            relation_ship_fields: fields.iter().map(|s| s.to_string()).collect(),
            relation_ship_references: references.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn field_relation_detection() {
        assert!(!field(&[], &[]).is_relation());
        assert!(field(&["authorId"], &[]).is_relation());
        assert!(field(&[], &["id"]).is_relation());
    }

    #[test]
    fn field_type_uses_wire_key() {
        let value = json!({
            "name": "id",
            "type": "Int",
            "is_index": true,
            "constraints": ["@id"],
            "relation_ship_fields": [],
            "relation_ship_references": []
        });
        let parsed: Field = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.field_type, "Int");
        assert!(parsed.is_index);

        let back = serde_json::to_value(&parsed).unwrap();
        assert_eq!(back["type"], "Int");
    }

    #[test]
    fn display_mode_defaults_to_collapsed() {
        assert_eq!(DisplayMode::default(), DisplayMode::Collapsed);
        assert!(!DisplayMode::Collapsed.is_expanded());
        assert!(DisplayMode::Table.is_expanded());
        assert!(DisplayMode::Code.is_expanded());
    }

    #[test]
    fn display_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_value(DisplayMode::Code).unwrap(), json!("code"));
        assert_eq!(DisplayMode::Table.to_string(), "table");
    }

    #[test]
    fn highlight_request_shape() {
        let request = CodeHighlightRequest {
            span: Span::new(0, 19),
            schema: "model User {id Int}",
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"span": {"start": 0, "end": 19}, "schema": "model User {id Int}"})
        );
    }

    #[test]
    fn highlight_response_ignores_extra_keys() {
        let body = json!({"code": {"html": "<div></div>", "span": {"start": 0, "end": 1}}});
        let parsed: CodeHighlightResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.code.html, "<div></div>");
    }
}
