//! Relationship handle

use std::sync::Arc;

use super::cell::{EntityCell, EntityData};
use super::converter::EntityPayload;
use super::node::RestNode;
use super::GraphEntity;
use crate::api::RestApi;
use crate::error::Result;

/// Client-side handle for a remote relationship.
///
/// Structural data (start node, end node, type) is fixed at creation time
/// on the server; it is cached on first access and never refetched.
#[derive(Clone)]
pub struct RestRelationship {
  cell: Arc<EntityCell>,
}

impl RestRelationship {
  pub(crate) fn from_cell(cell: Arc<EntityCell>) -> Self {
    Self { cell }
  }

  /// Handle backed by a parsed server representation
  pub(crate) fn from_payload(api: &RestApi, payload: EntityPayload) -> Self {
    let data = EntityData::new(payload.props, payload.rel);
    Self {
      cell: EntityCell::new_bound(api.clone(), payload.uri, Some(data)),
    }
  }

  /// Handle backed by a bare URI; representation loads lazily
  pub(crate) fn from_uri(api: &RestApi, uri: String) -> Self {
    Self {
      cell: EntityCell::new_bound(api.clone(), uri, None),
    }
  }

  pub fn start_node(&self) -> Result<RestNode> {
    let rel = self.cell.rel_data()?;
    Ok(RestNode::from_uri(self.cell.api(), rel.start_uri))
  }

  pub fn end_node(&self) -> Result<RestNode> {
    let rel = self.cell.rel_data()?;
    Ok(RestNode::from_uri(self.cell.api(), rel.end_uri))
  }

  pub fn rel_type(&self) -> Result<String> {
    Ok(self.cell.rel_data()?.rel_type)
  }

  /// The node on the other side of this relationship
  pub fn other_node(&self, node: &RestNode) -> Result<RestNode> {
    let rel = self.cell.rel_data()?;
    let node_uri = node.uri()?;
    if rel.start_uri == node_uri {
      Ok(RestNode::from_uri(self.cell.api(), rel.end_uri))
    } else {
      Ok(RestNode::from_uri(self.cell.api(), rel.start_uri))
    }
  }
}

impl GraphEntity for RestRelationship {
  #[doc(hidden)]
  fn cell(&self) -> &Arc<EntityCell> {
    &self.cell
  }
}

impl std::fmt::Debug for RestRelationship {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.cell.uri() {
      Ok(uri) => write!(f, "RestRelationship({uri})"),
      Err(_) => write!(f, "RestRelationship(unbound)"),
    }
  }
}
