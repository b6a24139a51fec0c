//! Response body validation.
//!
//! The parse and highlight services are untrusted. Bodies are checked
//! against the JSON Schemas below before being deserialized, so a mismatch
//! is reported with the JSON Pointer of every offending value instead of the
//! first serde error.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{FetchError, PayloadError};

/// JSON Schema for the `/api/v1/visualise` response.
pub fn schema_result_schema() -> Value {
    let string_list = json!({ "type": "array", "items": { "type": "string" } });
    json!({
        "type": "object",
        "required": ["schema", "result"],
        "properties": {
            "schema": { "type": "string" },
            "result": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["id", "name", "span", "fields", "code"],
                    "properties": {
                        "id": { "type": "string" },
                        "name": { "type": "string" },
                        "span": {
                            "type": "object",
                            "required": ["start", "end"],
                            "properties": {
                                "start": { "type": "integer", "minimum": 0 },
                                "end": { "type": "integer", "minimum": 0 }
                            }
                        },
                        "code": { "type": "string" },
                        "fields": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": [
                                    "name",
                                    "type",
                                    "is_index",
                                    "constraints",
                                    "relation_ship_fields",
                                    "relation_ship_references"
                                ],
                                "properties": {
                                    "name": { "type": "string" },
                                    "type": { "type": "string" },
                                    "is_index": { "type": "boolean" },
                                    "constraints": string_list,
                                    "relation_ship_fields": string_list,
                                    "relation_ship_references": string_list
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}

/// JSON Schema for the `/api/v1/code_highlight` response.
pub fn code_highlight_schema() -> Value {
    json!({
        "type": "object",
        "required": ["code"],
        "properties": {
            "code": {
                "type": "object",
                "required": ["html"],
                "properties": {
                    "html": { "type": "string" }
                }
            }
        }
    })
}

/// Validate a payload against a schema, collecting every mismatch.
pub fn validate_payload(schema: &Value, payload: &Value) -> Result<(), Vec<PayloadError>> {
    let validator = jsonschema::validator_for(schema).map_err(|e| {
        vec![PayloadError {
            path: String::new(),
            message: format!("invalid response schema: {e}"),
        }]
    })?;

    let errors: Vec<PayloadError> = validator
        .iter_errors(payload)
        .map(|e| PayloadError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse a raw response body into `T`, checking it against `schema` first.
///
/// # Errors
///
/// Returns `FetchError::InvalidJson` for non-JSON bodies and
/// `FetchError::InvalidPayload` for bodies of the wrong shape.
pub fn decode_body<T: DeserializeOwned>(
    url: &str,
    body: &str,
    schema: &Value,
) -> Result<T, FetchError> {
    let payload: Value = serde_json::from_str(body).map_err(|source| FetchError::InvalidJson {
        url: url.to_string(),
        source,
    })?;

    validate_payload(schema, &payload).map_err(|errors| FetchError::InvalidPayload {
        url: url.to_string(),
        errors,
    })?;

    serde_json::from_value(payload).map_err(|e| FetchError::InvalidPayload {
        url: url.to_string(),
        errors: vec![PayloadError {
            path: String::new(),
            message: e.to_string(),
        }],
    })
}
