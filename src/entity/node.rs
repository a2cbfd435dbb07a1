//! Node handle

use std::sync::Arc;

use super::cell::{EntityCell, EntityData};
use super::converter::EntityPayload;
use super::GraphEntity;
use crate::api::RestApi;
use crate::entity::relationship::RestRelationship;
use crate::error::Result;
use crate::types::{Direction, PropMap};

/// Client-side handle for a remote node.
///
/// Cheap to clone; all clones share the same cell, so a node returned from
/// a recording call becomes readable everywhere once its batch completes.
#[derive(Clone)]
pub struct RestNode {
  cell: Arc<EntityCell>,
}

impl RestNode {
  pub(crate) fn from_cell(cell: Arc<EntityCell>) -> Self {
    Self { cell }
  }

  /// Handle backed by a parsed server representation
  pub(crate) fn from_payload(api: &RestApi, payload: EntityPayload) -> Self {
    let data = EntityData::new(payload.props, None);
    Self {
      cell: EntityCell::new_bound(api.clone(), payload.uri, Some(data)),
    }
  }

  /// Handle backed by a bare URI; properties load lazily on first read
  pub(crate) fn from_uri(api: &RestApi, uri: String) -> Self {
    Self {
      cell: EntityCell::new_bound(api.clone(), uri, None),
    }
  }

  /// Create a relationship from this node, immediately
  pub fn create_relationship_to(
    &self,
    end: &RestNode,
    rel_type: &str,
    props: PropMap,
  ) -> Result<RestRelationship> {
    self.cell.api().create_relationship(self, end, rel_type, props)
  }

  /// List this node's relationships in the given direction, immediately
  pub fn relationships(&self, direction: Direction) -> Result<Vec<RestRelationship>> {
    self.cell.api().relationships_of(self, direction)
  }
}

impl GraphEntity for RestNode {
  #[doc(hidden)]
  fn cell(&self) -> &Arc<EntityCell> {
    &self.cell
  }
}

impl std::fmt::Debug for RestNode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.cell.uri() {
      Ok(uri) => write!(f, "RestNode({uri})"),
      Err(_) => write!(f, "RestNode(unbound)"),
    }
  }
}
