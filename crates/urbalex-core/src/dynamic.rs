//! Free-form JSON fields edited as raw text in the console.
//!
//! Condition and formula objects have no fixed schema: the console shows
//! them as text, and on save they are parsed back into JSON. A value that
//! fails to parse is kept verbatim as raw text rather than dropped, so the
//! admin's input is never lost and the distinction is explicit in the type.

use serde::{Deserialize, Serialize};

/// A dynamic condition/formula value: parsed JSON, or raw text that did not
/// parse.
///
/// Serializes untagged — `Parsed` as the JSON value itself, `Raw` as a JSON
/// string. Deserialization therefore always yields `Parsed`; `Raw` only
/// arises locally via [`from_input`](Self::from_input).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DynamicValue {
    Parsed(serde_json::Value),
    Raw(String),
}

impl DynamicValue {
    /// Parse console input, falling back to raw text when it is not JSON.
    pub fn from_input(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => Self::Parsed(value),
            Err(_) => Self::Raw(text.to_string()),
        }
    }

    /// The parsed JSON value, if this value parsed.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// Text form for the edit surface: pretty JSON for parsed values, the
    /// original input for raw ones.
    pub fn to_input(&self) -> String {
        match self {
            Self::Parsed(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            Self::Raw(text) => text.clone(),
        }
    }
}
