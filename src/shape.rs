//! Cardinality coercion for XML-derived JSON.
//!
//! A repeated XML element arrives as a bare string, a single object or an
//! array depending on how many occurrences the source had. These helpers turn
//! any of those into a sequence so the rest of the crate only ever sees one
//! shape. Nothing here can fail: unrecognised values become "no data".

use serde_json::{Map, Value};

/// How a decoded value is laid out at the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Absent,
    Scalar,
    Object,
    List,
}

impl Shape {
    pub fn of(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Absent,
            Some(Value::String(_) | Value::Number(_) | Value::Bool(_)) => Self::Scalar,
            Some(Value::Object(_)) => Self::Object,
            Some(Value::Array(_)) => Self::List,
        }
    }
}

/// Coerce "zero or more" of anything into a sequence of values.
///
/// Arrays are returned element-wise as they are; nested values are not
/// touched.
pub fn coerce(value: Option<&Value>) -> Vec<Value> {
    match (Shape::of(value), value) {
        (Shape::List, Some(Value::Array(items))) => items.clone(),
        (Shape::Scalar | Shape::Object, Some(single)) => vec![single.clone()],
        _ => Vec::new(),
    }
}

/// Coerce "zero or more" objects, dropping elements that are not objects.
pub fn coerce_objects(value: Option<&Value>) -> Vec<Map<String, Value>> {
    coerce(value)
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// Coerce "zero or more" strings.
///
/// Elements that carried XML attributes arrive as `{"text": ...}` objects and
/// contribute their text; anything without a textual value is skipped.
pub fn coerce_strings(value: Option<&Value>) -> Vec<String> {
    coerce(value)
        .iter()
        .filter_map(scalar_text)
        .collect()
}

/// Textual value of a scalar, or of an element's `text` node.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => map.get("text").and_then(scalar_text),
        Value::Null | Value::Array(_) => None,
    }
}
