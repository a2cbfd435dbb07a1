//! Core type definitions
//!
//! Identifier aliases, the property value model and the entity reference
//! shared by the whole crate. Property values are strictly typed: numeric
//! and array values keep their original element type across a wire round
//! trip instead of collapsing into a generic numeric sequence.

use std::collections::BTreeMap;

use serde_json::{Number, Value};

use crate::error::{RestError, Result};

// ============================================================================
// Identifier aliases
// ============================================================================

/// Position of an operation within one batch; the only correlation key
/// between a batch request and its response
pub type BatchId = u64;

/// Server-side numeric identity of a node or relationship
pub type EntityId = u64;

/// Property map with deterministic iteration order
pub type PropMap = BTreeMap<String, PropValue>;

// ============================================================================
// Entity reference
// ============================================================================

/// Reference to a remote entity.
///
/// A reference is exactly one of resolved (a concrete URI) or pending ("the
/// entity that batch operation N will create"). Pending references may point
/// forward or backward within one batch; the server resolves the whole batch
/// atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
  /// Concrete entity URI on the server
  Resolved(String),
  /// Result of the batch operation with this id
  Pending(BatchId),
}

// ============================================================================
// Direction
// ============================================================================

/// Relationship direction, viewed from a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Outgoing,
  Incoming,
  Both,
}

impl Direction {
  /// Wire segment used in relationship listing and traversal descriptions
  pub fn as_wire(&self) -> &'static str {
    match self {
      Direction::Outgoing => "out",
      Direction::Incoming => "in",
      Direction::Both => "all",
    }
  }
}

// ============================================================================
// Property values
// ============================================================================

/// A single property value.
///
/// Arrays are homogeneous and keep their element type: a property written as
/// an array of doubles reads back as `Floats`, never as `Ints` or a mixed
/// sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
  Bool(bool),
  Int(i64),
  Float(f64),
  String(String),
  Bools(Vec<bool>),
  Ints(Vec<i64>),
  Floats(Vec<f64>),
  Strings(Vec<String>),
}

impl PropValue {
  pub fn as_bool(&self) -> Option<bool> {
    match self {
      PropValue::Bool(v) => Some(*v),
      _ => None,
    }
  }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      PropValue::Int(v) => Some(*v),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      PropValue::Float(v) => Some(*v),
      PropValue::Int(v) => Some(*v as f64),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      PropValue::String(v) => Some(v),
      _ => None,
    }
  }

  pub fn as_floats(&self) -> Option<&[f64]> {
    match self {
      PropValue::Floats(v) => Some(v),
      _ => None,
    }
  }

  /// Serialize for the wire
  pub fn to_json(&self) -> Value {
    match self {
      PropValue::Bool(v) => Value::Bool(*v),
      PropValue::Int(v) => Value::Number(Number::from(*v)),
      PropValue::Float(v) => {
        // Non-finite floats have no JSON representation and serialize as
        // null
        Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null)
      }
      PropValue::String(v) => Value::String(v.clone()),
      PropValue::Bools(vs) => Value::Array(vs.iter().map(|v| Value::Bool(*v)).collect()),
      PropValue::Ints(vs) => {
        Value::Array(vs.iter().map(|v| Value::Number(Number::from(*v))).collect())
      }
      PropValue::Floats(vs) => Value::Array(
        vs.iter()
          .map(|v| Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null))
          .collect(),
      ),
      PropValue::Strings(vs) => {
        Value::Array(vs.iter().map(|v| Value::String(v.clone())).collect())
      }
    }
  }

  /// Parse a property value from its wire representation.
  ///
  /// Array typing: all-bool, all-integer, any-float numeric and all-string
  /// arrays map to the corresponding homogeneous variant. Heterogeneous or
  /// nested arrays are a protocol error. An empty array materializes as
  /// `Strings`.
  pub fn from_json(value: &Value) -> Result<PropValue> {
    match value {
      Value::Bool(v) => Ok(PropValue::Bool(*v)),
      Value::Number(n) => number_to_prop(n),
      Value::String(s) => Ok(PropValue::String(s.clone())),
      Value::Array(items) => array_to_prop(items),
      other => Err(RestError::InvalidProperty(format!(
        "unsupported property representation: {other}"
      ))),
    }
  }
}

fn number_to_prop(n: &Number) -> Result<PropValue> {
  if let Some(v) = n.as_i64() {
    return Ok(PropValue::Int(v));
  }
  if let Some(v) = n.as_f64() {
    return Ok(PropValue::Float(v));
  }
  Err(RestError::InvalidProperty(format!("unrepresentable number: {n}")))
}

fn array_to_prop(items: &[Value]) -> Result<PropValue> {
  if items.is_empty() {
    return Ok(PropValue::Strings(Vec::new()));
  }

  if items.iter().all(Value::is_boolean) {
    let vs = items.iter().filter_map(Value::as_bool).collect();
    return Ok(PropValue::Bools(vs));
  }

  if items.iter().all(Value::is_i64) {
    let vs = items.iter().filter_map(Value::as_i64).collect();
    return Ok(PropValue::Ints(vs));
  }

  // Mixed integers and floats widen to floats; anything non-numeric at this
  // point makes the array heterogeneous.
  if items.iter().all(Value::is_number) {
    let vs = items.iter().filter_map(Value::as_f64).collect();
    return Ok(PropValue::Floats(vs));
  }

  if items.iter().all(Value::is_string) {
    let vs = items
      .iter()
      .filter_map(Value::as_str)
      .map(str::to_string)
      .collect();
    return Ok(PropValue::Strings(vs));
  }

  Err(RestError::InvalidProperty(
    "heterogeneous or nested property array".to_string(),
  ))
}

// ============================================================================
// Conversions from plain Rust values
// ============================================================================

impl From<bool> for PropValue {
  fn from(v: bool) -> Self {
    PropValue::Bool(v)
  }
}

impl From<i64> for PropValue {
  fn from(v: i64) -> Self {
    PropValue::Int(v)
  }
}

impl From<i32> for PropValue {
  fn from(v: i32) -> Self {
    PropValue::Int(v as i64)
  }
}

impl From<f64> for PropValue {
  fn from(v: f64) -> Self {
    PropValue::Float(v)
  }
}

impl From<&str> for PropValue {
  fn from(v: &str) -> Self {
    PropValue::String(v.to_string())
  }
}

impl From<String> for PropValue {
  fn from(v: String) -> Self {
    PropValue::String(v)
  }
}

impl From<Vec<bool>> for PropValue {
  fn from(v: Vec<bool>) -> Self {
    PropValue::Bools(v)
  }
}

impl From<Vec<i64>> for PropValue {
  fn from(v: Vec<i64>) -> Self {
    PropValue::Ints(v)
  }
}

impl From<Vec<f64>> for PropValue {
  fn from(v: Vec<f64>) -> Self {
    PropValue::Floats(v)
  }
}

impl From<Vec<String>> for PropValue {
  fn from(v: Vec<String>) -> Self {
    PropValue::Strings(v)
  }
}

impl From<Vec<&str>> for PropValue {
  fn from(v: Vec<&str>) -> Self {
    PropValue::Strings(v.into_iter().map(str::to_string).collect())
  }
}

// ============================================================================
// Property map conversions
// ============================================================================

/// Serialize a property map for the wire
pub fn props_to_json(props: &PropMap) -> Value {
  let map = props
    .iter()
    .map(|(k, v)| (k.clone(), v.to_json()))
    .collect::<serde_json::Map<String, Value>>();
  Value::Object(map)
}

/// Parse a property map from its wire representation
pub fn props_from_json(value: &Value) -> Result<PropMap> {
  let map = value.as_object().ok_or_else(|| {
    RestError::Protocol(format!("expected a property object, got: {value}"))
  })?;

  let mut props = PropMap::new();
  for (key, raw) in map {
    props.insert(key.clone(), PropValue::from_json(raw)?);
  }
  Ok(props)
}

// ============================================================================
// Tests
// ============================================================================
