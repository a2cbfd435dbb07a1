//! Batch request construction
//!
//! Serializes a complete ledger into the wire format: one descriptor per
//! operation, each preserving its batch id. Intra-batch references are
//! rewritten into the server's `{N}` placeholder syntax here, and only
//! here, once the full ledger is known.

use serde::Serialize;
use serde_json::Value;

use super::operation::{OpBody, Operation, OperationLedger};
use crate::transport::join_uri;
use crate::types::{props_to_json, BatchId, EntityRef};

// ============================================================================
// Wire descriptor
// ============================================================================

/// One element of the wire-level batch array
#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct BatchEntry {
  pub method: &'static str,
  pub to: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub body: Option<Value>,
  pub id: BatchId,
}

// ============================================================================
// Building
// ============================================================================

/// Serialize the ledger into wire descriptors, in recording order.
///
/// Building never fails: malformed references are a programming error the
/// recorder's type contracts rule out.
pub(crate) fn build_batch_request(ledger: &OperationLedger, base_uri: &str) -> Vec<BatchEntry> {
  ledger
    .iter()
    .map(|op| BatchEntry {
      method: op.method.http_method().as_str(),
      to: render_target(op, base_uri),
      body: op.body.as_ref().map(render_body),
      id: op.batch_id,
    })
    .collect()
}

/// `{N}` placeholder for a pending reference, the URI otherwise
fn render_ref(reference: &EntityRef) -> String {
  match reference {
    EntityRef::Resolved(uri) => uri.clone(),
    EntityRef::Pending(id) => format!("{{{id}}}"),
  }
}

/// Target URI of one descriptor: relative when under the batch's base URI,
/// absolute otherwise, placeholder-prefixed for intra-batch references.
fn render_target(op: &Operation, base_uri: &str) -> String {
  match &op.target.base {
    None => {
      if op.base_uri == base_uri {
        op.target.suffix.clone()
      } else {
        join_uri(&op.base_uri, &op.target.suffix)
      }
    }
    Some(EntityRef::Pending(id)) => {
      let placeholder = format!("{{{id}}}");
      if op.target.suffix.is_empty() {
        placeholder
      } else {
        join_uri(&placeholder, &op.target.suffix)
      }
    }
    Some(EntityRef::Resolved(uri)) => {
      let full = join_uri(uri, &op.target.suffix);
      match full.strip_prefix(base_uri) {
        Some(rest) => rest.trim_start_matches('/').to_string(),
        None => full,
      }
    }
  }
}

fn render_body(body: &OpBody) -> Value {
  match body {
    OpBody::Json(value) => value.clone(),
    OpBody::Relationship { to, rel_type, props } => {
      let mut map = serde_json::Map::new();
      map.insert("to".to_string(), Value::String(render_ref(to)));
      map.insert("type".to_string(), Value::String(rel_type.clone()));
      if !props.is_empty() {
        map.insert("data".to_string(), props_to_json(props));
      }
      Value::Object(map)
    }
    OpBody::IndexEntry { entity } => Value::String(render_ref(entity)),
  }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
  use super::*;
  use crate::batch::operation::{OpMethod, OpTarget};
  use crate::types::{PropMap, PropValue};
  use serde_json::json;

  const BASE: &str = "http://localhost:7474/db/data";

  fn op(
    batch_id: BatchId,
    method: OpMethod,
    target: OpTarget,
    body: Option<OpBody>,
  ) -> Operation {
    Operation {
      batch_id,
      method,
      target,
      body,
      base_uri: BASE.to_string(),
      converter: None,
      bind: None,
    }
  }

  fn build(ops: Vec<Operation>) -> Vec<BatchEntry> {
    let mut ledger = OperationLedger::new();
    for operation in ops {
      ledger.insert(operation);
    }
    build_batch_request(&ledger, BASE)
  }

  #[test]
  fn test_root_target_is_relative() {
    let entries = build(vec![op(
      0,
      OpMethod::Create,
      OpTarget::root("node"),
      Some(OpBody::Json(json!({}))),
    )]);
    assert_eq!(entries[0].to, "node");
    assert_eq!(entries[0].method, "POST");
    assert_eq!(entries[0].id, 0);
  }

  #[test]
  fn test_pending_reference_becomes_placeholder() {
    let entries = build(vec![op(
      0,
      OpMethod::Create,
      OpTarget::entity(EntityRef::Pending(3), "relationships"),
      None,
    )]);
    assert_eq!(entries[0].to, "{3}/relationships");
  }

  #[test]
  fn test_pending_reference_bare() {
    let entries = build(vec![op(
      0,
      OpMethod::Delete,
      OpTarget::entity(EntityRef::Pending(1), ""),
      None,
    )]);
    assert_eq!(entries[0].to, "{1}");
  }

  #[test]
  fn test_same_origin_uri_is_relativized() {
    let entries = build(vec![op(
      0,
      OpMethod::Get,
      OpTarget::entity(
        EntityRef::Resolved(format!("{BASE}/node/5")),
        "properties",
      ),
      None,
    )]);
    assert_eq!(entries[0].to, "node/5/properties");
  }

  #[test]
  fn test_cross_origin_uri_stays_absolute_with_single_slash() {
    let entries = build(vec![op(
      0,
      OpMethod::Get,
      OpTarget::entity(
        EntityRef::Resolved("http://other:7474/db/data/node/5/".to_string()),
        "/properties",
      ),
      None,
    )]);
    assert_eq!(entries[0].to, "http://other:7474/db/data/node/5/properties");
  }

  #[test]
  fn test_missing_body_is_omitted_from_wire() {
    let entries = build(vec![op(0, OpMethod::Get, OpTarget::root("node/1"), None)]);
    let wire = serde_json::to_value(&entries).unwrap();
    assert_eq!(wire, json!([{"method": "GET", "to": "node/1", "id": 0}]));
  }

  #[test]
  fn test_relationship_body_rewrites_pending_end_node() {
    let mut props = PropMap::new();
    props.insert("weight".to_string(), PropValue::Int(5));

    let entries = build(vec![op(
      0,
      OpMethod::Create,
      OpTarget::entity(EntityRef::Pending(0), "relationships"),
      Some(OpBody::Relationship {
        to: EntityRef::Pending(1),
        rel_type: "KNOWS".to_string(),
        props,
      }),
    )]);

    assert_eq!(
      entries[0].body.as_ref().unwrap(),
      &json!({"to": "{1}", "type": "KNOWS", "data": {"weight": 5}})
    );
  }

  #[test]
  fn test_relationship_body_omits_empty_props() {
    let entries = build(vec![op(
      0,
      OpMethod::Create,
      OpTarget::entity(EntityRef::Pending(0), "relationships"),
      Some(OpBody::Relationship {
        to: EntityRef::Resolved(format!("{BASE}/node/9")),
        rel_type: "KNOWS".to_string(),
        props: PropMap::new(),
      }),
    )]);

    assert_eq!(
      entries[0].body.as_ref().unwrap(),
      &json!({"to": format!("{BASE}/node/9"), "type": "KNOWS"})
    );
  }

  #[test]
  fn test_index_entry_body_is_reference_string() {
    let entries = build(vec![op(
      0,
      OpMethod::AddToIndex,
      OpTarget::root("index/node/people/name/alice"),
      Some(OpBody::IndexEntry {
        entity: EntityRef::Pending(2),
      }),
    )]);
    assert_eq!(entries[0].body.as_ref().unwrap(), &json!("{2}"));
  }
}
