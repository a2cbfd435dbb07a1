//! Traversal descriptions
//!
//! A fluent builder that renders the server's JSON traversal description.
//! Traversals always execute immediately against the server; they are never
//! recorded into a batch.

use serde_json::{json, Value};

use crate::constants::{STATUS_OK, TRAVERSAL_PATH};
use crate::entity::{GraphEntity, RestNode, RestRelationship};
use crate::error::{RestError, Result};
use crate::transport::{join_uri, HttpMethod};
use crate::types::Direction;

// ============================================================================
// Description
// ============================================================================

/// Traversal order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalOrder {
  BreadthFirst,
  DepthFirst,
}

impl TraversalOrder {
  fn as_wire(&self) -> &'static str {
    match self {
      TraversalOrder::BreadthFirst => "breadth_first",
      TraversalOrder::DepthFirst => "depth_first",
    }
  }
}

/// Node/relationship revisit policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uniqueness {
  NodeGlobal,
  NodePath,
  RelationshipGlobal,
  RelationshipPath,
  None,
}

impl Uniqueness {
  fn as_wire(&self) -> &'static str {
    match self {
      Uniqueness::NodeGlobal => "node_global",
      Uniqueness::NodePath => "node_path",
      Uniqueness::RelationshipGlobal => "relationship_global",
      Uniqueness::RelationshipPath => "relationship_path",
      Uniqueness::None => "none",
    }
  }
}

/// Builder for a server-side traversal
#[derive(Debug, Clone)]
pub struct TraversalDescription {
  order: TraversalOrder,
  uniqueness: Option<Uniqueness>,
  max_depth: Option<u64>,
  relationships: Vec<(String, Direction)>,
}

impl Default for TraversalDescription {
  fn default() -> Self {
    Self::new()
  }
}

impl TraversalDescription {
  pub fn new() -> Self {
    Self {
      order: TraversalOrder::BreadthFirst,
      uniqueness: None,
      max_depth: None,
      relationships: Vec::new(),
    }
  }

  pub fn breadth_first(mut self) -> Self {
    self.order = TraversalOrder::BreadthFirst;
    self
  }

  pub fn depth_first(mut self) -> Self {
    self.order = TraversalOrder::DepthFirst;
    self
  }

  pub fn max_depth(mut self, depth: u64) -> Self {
    self.max_depth = Some(depth);
    self
  }

  pub fn uniqueness(mut self, uniqueness: Uniqueness) -> Self {
    self.uniqueness = Some(uniqueness);
    self
  }

  /// Restrict the traversal to one relationship type and direction;
  /// repeatable.
  pub fn relationship(mut self, rel_type: &str, direction: Direction) -> Self {
    self.relationships.push((rel_type.to_string(), direction));
    self
  }

  pub(crate) fn to_json(&self) -> Value {
    let mut description = serde_json::Map::new();
    description.insert("order".to_string(), json!(self.order.as_wire()));
    if let Some(uniqueness) = self.uniqueness {
      description.insert("uniqueness".to_string(), json!(uniqueness.as_wire()));
    }
    if let Some(depth) = self.max_depth {
      description.insert("max_depth".to_string(), json!(depth));
    }
    if !self.relationships.is_empty() {
      let rels = self
        .relationships
        .iter()
        .map(|(rel_type, direction)| {
          json!({"type": rel_type, "direction": direction.as_wire()})
        })
        .collect::<Vec<_>>();
      description.insert("relationships".to_string(), Value::Array(rels));
    }
    Value::Object(description)
  }

  /// Run the traversal from a start node, materializing the result paths
  pub fn traverse(&self, start: &RestNode) -> Result<Vec<Path>> {
    let api = start.cell().api().clone();
    let uri = join_uri(&start.uri()?, &format!("{TRAVERSAL_PATH}/path"));
    let body = self.to_json();
    let result = api.transport().send(HttpMethod::Post, &uri, Some(&body))?;
    if result.status_other_than(STATUS_OK) {
      return Err(RestError::UnexpectedStatus {
        method: "POST",
        uri,
        status: result.status,
      });
    }

    let items = result
      .body
      .as_ref()
      .and_then(Value::as_array)
      .ok_or_else(|| RestError::Protocol("traversal response is not an array".to_string()))?;

    items.iter().map(|item| Path::from_value(&api, item)).collect()
  }
}

// ============================================================================
// Path
// ============================================================================

/// One materialized traversal path
pub struct Path {
  nodes: Vec<RestNode>,
  relationships: Vec<RestRelationship>,
}

impl Path {
  fn from_value(api: &crate::api::RestApi, value: &Value) -> Result<Path> {
    let map = value.as_object().ok_or_else(|| {
      RestError::Protocol(format!("path representation is not an object: {value}"))
    })?;

    let nodes = uri_list(map.get("nodes"))?
      .into_iter()
      .map(|uri| RestNode::from_uri(api, uri))
      .collect::<Vec<_>>();
    let relationships = uri_list(map.get("relationships"))?
      .into_iter()
      .map(|uri| RestRelationship::from_uri(api, uri))
      .collect::<Vec<_>>();

    if nodes.is_empty() {
      return Err(RestError::Protocol("path has no nodes".to_string()));
    }
    Ok(Path { nodes, relationships })
  }

  /// Path of length one spanning a single relationship
  pub fn from_relationship(rel: &RestRelationship) -> Result<Path> {
    Ok(Path {
      nodes: vec![rel.start_node()?, rel.end_node()?],
      relationships: vec![rel.clone()],
    })
  }

  pub fn start_node(&self) -> &RestNode {
    &self.nodes[0]
  }

  pub fn end_node(&self) -> &RestNode {
    &self.nodes[self.nodes.len() - 1]
  }

  pub fn nodes(&self) -> &[RestNode] {
    &self.nodes
  }

  pub fn relationships(&self) -> &[RestRelationship] {
    &self.relationships
  }

  pub fn last_relationship(&self) -> Option<&RestRelationship> {
    self.relationships.last()
  }

  /// Number of relationships in the path
  pub fn length(&self) -> usize {
    self.relationships.len()
  }
}

fn uri_list(value: Option<&Value>) -> Result<Vec<String>> {
  let items = value
    .and_then(Value::as_array)
    .ok_or_else(|| RestError::Protocol("path segment list missing".to_string()))?;
  items
    .iter()
    .map(|item| {
      item
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| RestError::Protocol(format!("path segment is not a URI: {item}")))
    })
    .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_description_defaults() {
    let description = TraversalDescription::new().to_json();
    assert_eq!(description, json!({"order": "breadth_first"}));
  }

  #[test]
  fn test_description_full() {
    let description = TraversalDescription::new()
      .depth_first()
      .max_depth(3)
      .uniqueness(Uniqueness::NodeGlobal)
      .relationship("KNOWS", Direction::Outgoing)
      .relationship("LIKES", Direction::Both)
      .to_json();

    assert_eq!(
      description,
      json!({
        "order": "depth_first",
        "uniqueness": "node_global",
        "max_depth": 3,
        "relationships": [
          {"type": "KNOWS", "direction": "out"},
          {"type": "LIKES", "direction": "all"},
        ],
      })
    );
  }
}
