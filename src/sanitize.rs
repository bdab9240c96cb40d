//! Value sanitizer - numbers out of loosely typed payload fields
//!
//! Historical rows carry numeric fields as JSON numbers, numeric strings, or
//! strings polluted by transport artifacts ("12?3"). Absence is always `None`;
//! zero is a real value.

use serde_json::Value;

/// Parse a numeric-looking value, stripping stray characters from strings.
pub fn sanitize_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

/// Non-negative whole count (reps, sets). Fractions are rounded.
pub fn sanitize_count(value: &Value) -> Option<u32> {
    sanitize_number(value)
        .filter(|v| *v >= 0.0)
        .map(|v| v.round().min(u32::MAX as f64) as u32)
}

/// Trimmed, non-empty text. Numbers are rendered so numeric ids survive.
pub fn sanitize_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Sanitize the first present field among `keys`.
///
/// A key holding `null` counts as absent so aliases further down still apply.
pub fn first_number(record: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| record.get(*k).and_then(sanitize_number))
}

pub fn first_count(record: &Value, keys: &[&str]) -> Option<u32> {
    keys.iter().find_map(|k| record.get(*k).and_then(sanitize_count))
}

pub fn first_text(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| record.get(*k).and_then(sanitize_text))
}
