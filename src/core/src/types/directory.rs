//! Raw directory data as returned by the upstream identity provider
//!
//! Upstream attribute payloads are loosely typed (scalars, flags, repeated
//! values, sometimes wrapped in `{"value": ...}` envelopes). They are mapped
//! into the tagged [`AttributeValue`] schema at the fetch boundary so the
//! mapper never sees dynamic shapes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A custom directory attribute, validated into one of three shapes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean-ish flag
    Flag(bool),
    /// Single scalar value
    Text(String),
    /// Repeated values, upstream order preserved
    Many(Vec<String>),
}

impl AttributeValue {
    /// Scalar view: first entry of a repeated value, the flag rendered as
    /// `"true"`/`"false"`, or the text itself.
    pub fn as_text(&self) -> Option<String> {
        match self {
            AttributeValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            AttributeValue::Many(values) => values
                .iter()
                .map(|v| v.trim())
                .find(|v| !v.is_empty())
                .map(|v| v.to_string()),
            AttributeValue::Flag(b) => Some(b.to_string()),
        }
    }

    /// Line view: repeated values as-is, or a scalar split on line breaks.
    /// Entries are trimmed and empties dropped; order is preserved.
    pub fn as_lines(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            AttributeValue::Text(s) => s.lines().collect(),
            AttributeValue::Many(values) => values.iter().map(|v| v.as_str()).collect(),
            AttributeValue::Flag(_) => return Vec::new(),
        };
        raw.iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(|line| line.to_string())
            .collect()
    }

    /// Flag view: `"1"`, `"true"`, `"yes"` and `"y"` (case-insensitive) are
    /// true; anything else, including absent scalars, is false.
    pub fn as_flag(&self) -> bool {
        match self {
            AttributeValue::Flag(b) => *b,
            _ => match self.as_text() {
                Some(text) => matches!(text.to_lowercase().as_str(), "1" | "true" | "yes" | "y"),
                None => false,
            },
        }
    }
}

/// Profile fields for one directory user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryProfile {
    /// Primary email as stored upstream (any case)
    pub primary_email: String,

    /// Display name, when present
    #[serde(default)]
    pub full_name: Option<String>,
}

/// One principal's raw directory data: profile, custom attributes, groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub profile: DirectoryProfile,

    /// Custom schema attributes keyed by attribute name
    #[serde(default)]
    pub attributes: HashMap<String, AttributeValue>,

    /// Group identifiers (emails) the user belongs to
    #[serde(default)]
    pub groups: Vec<String>,
}

impl DirectoryRecord {
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}
