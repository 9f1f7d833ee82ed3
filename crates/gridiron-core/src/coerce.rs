//! Best-effort numeric coercion for the `Value` column.
//!
//! The API mixes numbers, numeric strings and free text in the same fields.
//! Coercion never fails: anything that is not a finite number comes back as
//! `None`, and the caller records a diagnostic.

use serde_json::Value;

/// Convert an API value to a finite `f64`.
///
/// Accepts JSON numbers and strings that parse as numbers (surrounding
/// whitespace ignored). Booleans, arrays, objects, null, non-numeric text and
/// anything that would be NaN or infinite yield `None`.
pub fn to_finite(value: &Value) -> Option<f64> {
  let n = match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => parse_numeric(s),
    _ => None,
  }?;
  n.is_finite().then_some(n)
}

fn parse_numeric(s: &str) -> Option<f64> {
  let s = s.trim();
  // `f64::from_str` accepts "inf", "NaN" and friends; those are text here.
  if s.is_empty() || s.chars().any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E')) {
    return None;
  }
  s.parse().ok()
}

/// Compact rendering of a value for warning messages.
pub fn describe(value: &Value) -> String {
  let rendered = match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  };
  if rendered.chars().count() > 64 {
    let truncated: String = rendered.chars().take(61).collect();
    format!("{truncated}...")
  } else {
    rendered
  }
}
