//! Answer values stored in a record's `data_values`
//!
//! Submissions are schema-less: each answer key maps to an arbitrary JSON
//! value. Values are held as a closed union so merge rules can switch on the
//! variant instead of inspecting raw JSON. Structured answers (lists and
//! objects) stay opaque.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single answer value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Boolean(bool),
    Number(serde_json::Number),
    Text(String),
    Sequence(Vec<serde_json::Value>),
    Mapping(serde_json::Map<String, serde_json::Value>),
}

/// Variant tag of an [`AnswerValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    Boolean,
    Number,
    Text,
    Sequence,
    Mapping,
}

/// Answer key to value. JSON `null` answers are kept as `None`.
pub type AnswerMap = BTreeMap<String, Option<AnswerValue>>;

impl AnswerValue {
    pub fn kind(&self) -> AnswerKind {
        match self {
            Self::Boolean(_) => AnswerKind::Boolean,
            Self::Number(_) => AnswerKind::Number,
            Self::Text(_) => AnswerKind::Text,
            Self::Sequence(_) => AnswerKind::Sequence,
            Self::Mapping(_) => AnswerKind::Mapping,
        }
    }

    /// Numeric value, if this is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Build a number answer from a float. Non-finite values are rejected.
    pub fn from_f64(value: f64) -> Option<Self> {
        serde_json::Number::from_f64(value).map(Self::Number)
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for AnswerValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Text coercion used when joining answers
impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
            Self::Sequence(items) => {
                let json = serde_json::Value::Array(items.clone());
                write!(f, "{}", json)
            }
            Self::Mapping(map) => {
                let json = serde_json::Value::Object(map.clone());
                write!(f, "{}", json)
            }
        }
    }
}
