//! Result binding
//!
//! Walks every operation in the ledger, not just the ones with fragments,
//! and feeds materialized results back into the caller-held placeholders.
//! Entity binds run first so that snapshot refreshes targeting an entity
//! created later in the same batch (a forward reference) find it bound.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace};

use super::operation::{BindTarget, Operation, OperationLedger};
use crate::api::RestApi;
use crate::entity::cell::{EntityCell, EntityData};
use crate::entity::converter::Converted;
use crate::entity::RestRelationship;
use crate::error::{RestError, Result};
use crate::transport::RequestResult;
use crate::types::{BatchId, PropMap};

enum Deferred {
  Snapshot(Arc<EntityCell>, PropMap),
  Invalidate(Arc<EntityCell>),
}

/// Bind every operation's outcome into its caller-held placeholder.
///
/// Consumes the ledger: a batch binds exactly once.
pub(crate) fn bind_results(
  api: &RestApi,
  ledger: OperationLedger,
  fragments: HashMap<BatchId, RequestResult>,
) -> Result<()> {
  let mut deferred = Vec::new();

  for op in ledger.iter() {
    let fragment = fragments.get(&op.batch_id);
    match &op.converter {
      Some(converter) => {
        // The batch reported success as a whole, so a missing result for
        // an operation that expects one is a defect in client or server.
        let fragment = fragment.ok_or_else(|| {
          RestError::Protocol(format!(
            "operation {} expected a result but the response has none",
            op.batch_id
          ))
        })?;
        let converted = converter.convert(fragment)?;
        bind_converted(api, op, converted, &mut deferred)?;
      }
      None => {
        // Fire-and-forget: a fragment is optional, completion means the
        // operation took effect on the server.
        trace!(
          "operation {} completed without a payload (fragment present: {})",
          op.batch_id,
          fragment.is_some()
        );
        if let Some(BindTarget::Invalidate(cell)) = &op.bind {
          deferred.push(Deferred::Invalidate(cell.clone()));
        }
      }
    }
  }

  // Snapshot refreshes and invalidations run after every entity is bound.
  for action in deferred {
    match action {
      Deferred::Snapshot(cell, props) => cell.refresh_snapshot(props)?,
      Deferred::Invalidate(cell) => cell.invalidate(),
    }
  }

  debug!("bound {} operations", ledger.len());
  Ok(())
}

fn bind_converted(
  api: &RestApi,
  op: &Operation,
  converted: Converted,
  deferred: &mut Vec<Deferred>,
) -> Result<()> {
  match (&op.bind, converted) {
    (Some(BindTarget::Entity(cell)), Converted::Entity(payload)) => {
      let data = EntityData::new(payload.props, payload.rel);
      cell.bind(payload.uri, Some(data))
    }
    (Some(BindTarget::Relationships(cell)), Converted::Entities(payloads)) => {
      let rels = payloads
        .into_iter()
        .map(|payload| RestRelationship::from_payload(api, payload))
        .collect();
      cell.fill(rels)
    }
    (Some(BindTarget::Snapshot(cell)), Converted::Properties(props)) => {
      deferred.push(Deferred::Snapshot(cell.clone(), props));
      Ok(())
    }
    (None, _) => Ok(()),
    _ => Err(RestError::Protocol(format!(
      "operation {} materialized an unexpected result shape",
      op.batch_id
    ))),
  }
}
