//! Result materialization
//!
//! Converters turn a raw response into a typed client-side value. Each
//! recorded operation picks its converter at recording time: the call site
//! knows what shape to expect, so type is never inferred from untyped JSON.
//! The direct (non-batched) API reuses the same capabilities.

use serde_json::Value;

use super::cell::RelData;
use crate::error::{RestError, Result};
use crate::transport::RequestResult;
use crate::types::{props_from_json, PropMap};

// ============================================================================
// Entity payload
// ============================================================================

/// Parsed server representation of one entity, ready to bind or to back a
/// fresh handle
#[derive(Debug, Clone)]
pub(crate) struct EntityPayload {
  pub uri: String,
  pub props: PropMap,
  /// Present when the representation describes a relationship
  pub rel: Option<RelData>,
}

impl EntityPayload {
  /// Parse a full entity representation: `self` URI, `data` property map,
  /// and `start`/`end`/`type` for relationships.
  pub fn from_value(value: &Value) -> Result<Self> {
    let map = value.as_object().ok_or_else(|| {
      RestError::Protocol(format!("entity representation is not an object: {value}"))
    })?;

    let uri = map
      .get("self")
      .and_then(Value::as_str)
      .ok_or_else(|| RestError::Protocol("entity representation has no self URI".to_string()))?
      .to_string();

    let props = match map.get("data") {
      Some(data) => props_from_json(data)?,
      None => PropMap::new(),
    };

    let rel = match (
      map.get("start").and_then(Value::as_str),
      map.get("end").and_then(Value::as_str),
      map.get("type").and_then(Value::as_str),
    ) {
      (Some(start), Some(end), Some(rel_type)) => Some(RelData {
        start_uri: start.to_string(),
        end_uri: end.to_string(),
        rel_type: rel_type.to_string(),
      }),
      _ => None,
    };

    Ok(Self { uri, props, rel })
  }

  /// Extract an entity from a response: prefer the body representation,
  /// fall back to the Location header for create responses without one.
  pub fn from_result(result: &RequestResult) -> Result<Self> {
    if let Some(body) = &result.body {
      return Self::from_value(body);
    }
    if let Some(location) = &result.location {
      return Ok(Self {
        uri: location.clone(),
        props: PropMap::new(),
        rel: None,
      });
    }
    Err(RestError::Protocol(
      "response carries neither an entity representation nor a location".to_string(),
    ))
  }
}

// ============================================================================
// Converters
// ============================================================================

/// Typed outcome of materializing one response
pub(crate) enum Converted {
  /// A single node or relationship representation
  Entity(EntityPayload),
  /// A bare property map
  Properties(PropMap),
  /// A sequence of entity representations (relationship listings, index
  /// hits)
  Entities(Vec<EntityPayload>),
}

/// Capability attached to an operation at recording time: how to turn the
/// raw response fragment into the value the call site expects
pub(crate) trait ResultConverter: Send + Sync {
  fn convert(&self, result: &RequestResult) -> Result<Converted>;
}

/// Materializes a single node or relationship
pub(crate) struct EntityExtractor;

impl ResultConverter for EntityExtractor {
  fn convert(&self, result: &RequestResult) -> Result<Converted> {
    Ok(Converted::Entity(EntityPayload::from_result(result)?))
  }
}

/// Materializes a bare property map
pub(crate) struct PropertiesConverter;

impl ResultConverter for PropertiesConverter {
  fn convert(&self, result: &RequestResult) -> Result<Converted> {
    // An entity without properties answers 204 and no body
    let props = match &result.body {
      Some(body) => props_from_json(body)?,
      None => PropMap::new(),
    };
    Ok(Converted::Properties(props))
  }
}

/// Materializes an array of entity representations
pub(crate) struct EntityListConverter;

impl ResultConverter for EntityListConverter {
  fn convert(&self, result: &RequestResult) -> Result<Converted> {
    let body = result
      .body
      .as_ref()
      .ok_or_else(|| RestError::Protocol("entity list response has no body".to_string()))?;
    let items = body
      .as_array()
      .ok_or_else(|| RestError::Protocol(format!("entity list is not an array: {body}")))?;

    let mut payloads = Vec::with_capacity(items.len());
    for item in items {
      payloads.push(EntityPayload::from_value(item)?);
    }
    Ok(Converted::Entities(payloads))
  }
}

// ============================================================================
// Tests
// ============================================================================
