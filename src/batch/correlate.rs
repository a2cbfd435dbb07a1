//! Batch response correlation
//!
//! The server answers a batch with either a single error object (whole
//! batch rejected) or an array of per-operation fragments. Fragments are
//! matched back to operations by batch id alone; response order is never
//! assumed to equal request order.

use std::collections::HashMap;

use log::debug;
use serde_json::Value;

use super::operation::OperationLedger;
use crate::error::{RestError, Result};
use crate::transport::RequestResult;
use crate::types::BatchId;

/// Map the raw batch response onto the ledger.
///
/// Fails with `BatchRejected` when the payload is a top-level error object,
/// and with `Protocol` on malformed, duplicate or unknown batch ids.
pub(crate) fn correlate(
  ledger: &OperationLedger,
  response: &RequestResult,
) -> Result<HashMap<BatchId, RequestResult>> {
  let body = response
    .body
    .as_ref()
    .ok_or_else(|| RestError::Protocol("batch response has no body".to_string()))?;

  let entries = match body {
    // A single object instead of a result array is the server's whole-batch
    // failure payload; carry it verbatim.
    Value::Object(_) => return Err(RestError::BatchRejected(body.clone())),
    Value::Array(entries) => entries,
    other => {
      return Err(RestError::Protocol(format!(
        "batch response is neither an array nor an error object: {other}"
      )))
    }
  };

  let mut fragments = HashMap::with_capacity(entries.len());
  for entry in entries {
    let map = entry.as_object().ok_or_else(|| {
      RestError::Protocol(format!("batch response fragment is not an object: {entry}"))
    })?;

    let batch_id = map
      .get("id")
      .and_then(Value::as_u64)
      .ok_or_else(|| RestError::Protocol(format!("batch response fragment has no id: {entry}")))?;

    if !ledger.contains(batch_id) {
      return Err(RestError::Protocol(format!(
        "batch response references unknown batch id {batch_id}"
      )));
    }

    let fragment = RequestResult::from_batch_fragment(map);
    if fragments.insert(batch_id, fragment).is_some() {
      return Err(RestError::Protocol(format!(
        "batch response carries batch id {batch_id} twice"
      )));
    }
  }

  debug!(
    "correlated {} fragments against {} recorded operations",
    fragments.len(),
    ledger.len()
  );
  Ok(fragments)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
  use super::*;
  use crate::batch::operation::{OpMethod, OpTarget, Operation};
  use serde_json::json;

  fn ledger_with_ids(ids: &[BatchId]) -> OperationLedger {
    let mut ledger = OperationLedger::new();
    for &id in ids {
      ledger.insert(Operation {
        batch_id: id,
        method: OpMethod::Get,
        target: OpTarget::root("node/1"),
        body: None,
        base_uri: "http://h/db/data".to_string(),
        converter: None,
        bind: None,
      });
    }
    ledger
  }

  fn response(body: serde_json::Value) -> RequestResult {
    RequestResult::new(200, None, Some(body))
  }

  #[test]
  fn test_error_object_rejects_whole_batch() {
    let ledger = ledger_with_ids(&[0]);
    let payload = json!({"exception": "BadInputException", "message": "boom"});
    match correlate(&ledger, &response(payload.clone())) {
      Err(RestError::BatchRejected(carried)) => assert_eq!(carried, payload),
      other => panic!("expected BatchRejected, got {other:?}"),
    }
  }

  #[test]
  fn test_fragments_keyed_by_id_not_position() {
    let ledger = ledger_with_ids(&[0, 1]);
    // Out-of-order response: correctness relies on ids alone
    let fragments = correlate(
      &ledger,
      &response(json!([
        {"id": 1, "body": {"self": "http://h/db/data/node/11"}},
        {"id": 0, "body": {"self": "http://h/db/data/node/10"}},
      ])),
    )
    .unwrap();

    assert_eq!(fragments.len(), 2);
    assert!(fragments[&0].body.as_ref().unwrap()["self"]
      .as_str()
      .unwrap()
      .ends_with("/node/10"));
  }

  #[test]
  fn test_unknown_batch_id_is_protocol_error() {
    let ledger = ledger_with_ids(&[0]);
    let outcome = correlate(&ledger, &response(json!([{"id": 7, "body": {}}])));
    match outcome {
      Err(RestError::Protocol(message)) => assert!(message.contains("unknown batch id 7")),
      other => panic!("expected Protocol, got {other:?}"),
    }
  }

  #[test]
  fn test_duplicate_batch_id_is_protocol_error() {
    let ledger = ledger_with_ids(&[0]);
    let outcome = correlate(
      &ledger,
      &response(json!([{"id": 0, "body": {}}, {"id": 0, "body": {}}])),
    );
    assert!(matches!(outcome, Err(RestError::Protocol(_))));
  }

  #[test]
  fn test_fragment_without_id_is_protocol_error() {
    let ledger = ledger_with_ids(&[0]);
    let outcome = correlate(&ledger, &response(json!([{"body": {}}])));
    assert!(matches!(outcome, Err(RestError::Protocol(_))));
  }

  #[test]
  fn test_missing_body_is_protocol_error() {
    let ledger = ledger_with_ids(&[0]);
    let outcome = correlate(&ledger, &RequestResult::new(200, None, None));
    assert!(matches!(outcome, Err(RestError::Protocol(_))));
  }
}
