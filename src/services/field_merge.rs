//! Field-level merge of answer maps
//!
//! The reduction is lossy on purpose: it favors one coherent record over
//! preserving every input. Rules per key, decided by the first non-null value:
//!
//! - number: arithmetic mean of the numeric values (other types dropped)
//! - text: all values coerced to text, joined with `" | "` in input order
//! - anything else: the first value as-is
//!
//! Keys that are absent or null everywhere are left out.

use std::collections::BTreeMap;

use crate::types::{AnswerKind, AnswerMap, AnswerValue};

pub const TEXT_SEPARATOR: &str = " | ";

/// Merge answer maps given in priority order
pub fn merge_fields(inputs: &[&AnswerMap]) -> AnswerMap {
    let mut collected: BTreeMap<&str, Vec<&AnswerValue>> = BTreeMap::new();

    for map in inputs {
        for (key, value) in map.iter() {
            let values = collected.entry(key.as_str()).or_default();
            if let Some(value) = value {
                values.push(value);
            }
        }
    }

    collected
        .into_iter()
        .filter_map(|(key, values)| reduce(&values).map(|v| (key.to_string(), Some(v))))
        .collect()
}

fn reduce(values: &[&AnswerValue]) -> Option<AnswerValue> {
    let first = *values.first()?;

    match first.kind() {
        AnswerKind::Number => {
            let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
            let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
            // A non-finite mean cannot be represented; keep the first value
            AnswerValue::from_f64(mean).or_else(|| Some(first.clone()))
        }
        AnswerKind::Text => {
            let joined = values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(TEXT_SEPARATOR);
            Some(AnswerValue::Text(joined))
        }
        AnswerKind::Boolean | AnswerKind::Sequence | AnswerKind::Mapping => Some(first.clone()),
    }
}
