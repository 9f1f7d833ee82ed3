//! Safe navigation over loosely-typed JSON payloads.
//!
//! A [`Node`] is a cursor that may or may not point at a value. Walking past a
//! missing key, into a non-object, or off the end of an array yields a missing
//! node rather than an error. The typed accessors then make the distinction
//! explicit: a missing node is `Ok(None)` (callers pick their default), a node
//! of the wrong JSON type is an [`Error::TypeMismatch`].

use serde_json::{Map, Value};

use crate::{Error, Result};

/// A possibly-absent position inside a JSON document, remembering the path
/// used to reach it for error messages.
#[derive(Debug, Clone)]
pub struct Node<'a> {
  value: Option<&'a Value>,
  path:  String,
}

impl<'a> Node<'a> {
  pub fn new(value: &'a Value) -> Self { Self { value: Some(value), path: String::new() } }

  /// Step into `key` of an object. Non-objects step to a missing node.
  pub fn get(&self, key: &str) -> Node<'a> {
    Node {
      value: self.value.and_then(|v| v.as_object()).and_then(|m| m.get(key)),
      path:  join_path(&self.path, key),
    }
  }

  /// Step through a dotted path such as `byeWeeks.2023`.
  pub fn dotted(&self, path: &str) -> Node<'a> {
    path.split('.').fold(self.clone(), |node, key| node.get(key))
  }

  /// Step into element `index` of an array.
  pub fn index(&self, index: usize) -> Node<'a> {
    Node {
      value: self.value.and_then(|v| v.as_array()).and_then(|a| a.get(index)),
      path:  format!("{}[{index}]", self.path),
    }
  }

  /// The raw value, treating JSON `null` the same as absence.
  pub fn value(&self) -> Option<&'a Value> { self.value.filter(|v| !v.is_null()) }

  pub fn is_missing(&self) -> bool { self.value().is_none() }

  pub fn path(&self) -> &str { &self.path }

  pub fn object(&self) -> Result<Option<&'a Map<String, Value>>> {
    match self.value() {
      None => Ok(None),
      Some(Value::Object(m)) => Ok(Some(m)),
      Some(other) => Err(self.mismatch("object", other)),
    }
  }

  pub fn array(&self) -> Result<Option<&'a Vec<Value>>> {
    match self.value() {
      None => Ok(None),
      Some(Value::Array(a)) => Ok(Some(a)),
      Some(other) => Err(self.mismatch("array", other)),
    }
  }

  pub fn str(&self) -> Result<Option<&'a str>> {
    match self.value() {
      None => Ok(None),
      Some(Value::String(s)) => Ok(Some(s)),
      Some(other) => Err(self.mismatch("string", other)),
    }
  }

  /// Render a string, number or boolean as text. Identifiers arrive from the
  /// API as either `"12"` or `12` depending on the endpoint.
  pub fn text(&self) -> Result<Option<String>> {
    match self.value() {
      None => Ok(None),
      Some(Value::String(s)) => Ok(Some(s.clone())),
      Some(Value::Number(n)) => Ok(Some(n.to_string())),
      Some(Value::Bool(b)) => Ok(Some(b.to_string())),
      Some(other) => Err(self.mismatch("scalar", other)),
    }
  }

  /// Like [`text`](Self::text) but an empty or whitespace-only string counts as
  /// missing.
  pub fn non_empty_text(&self) -> Result<Option<String>> {
    Ok(self.text()?.filter(|s| !s.trim().is_empty()))
  }

  /// Unwrap a one-element-style array to its first element; scalars pass
  /// through unchanged. An empty array is missing.
  pub fn first_or_self(&self) -> Node<'a> {
    match self.value {
      Some(Value::Array(_)) => self.index(0),
      _ => self.clone(),
    }
  }

  fn mismatch(&self, expected: &'static str, found: &Value) -> Error {
    Error::TypeMismatch {
      path: if self.path.is_empty() { "$".to_owned() } else { self.path.clone() },
      expected,
      found: type_name(found),
    }
  }
}

fn join_path(base: &str, key: &str) -> String {
  if base.is_empty() { key.to_owned() } else { format!("{base}.{key}") }
}

/// Short JSON type name for diagnostics.
pub fn type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
