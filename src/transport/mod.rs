//! HTTP transport layer
//!
//! Every server exchange funnels through the [`Transport`] trait so the
//! engine can run against an in-memory transport in tests. The production
//! implementation is [`HttpTransport`], a thin wrapper over a blocking
//! `ureq` agent.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::{debug, trace};
use serde_json::Value;

use crate::error::{RestError, Result};

// ============================================================================
// HTTP method
// ============================================================================

/// HTTP verb of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
  Get,
  Post,
  Put,
  Delete,
}

impl HttpMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      HttpMethod::Get => "GET",
      HttpMethod::Post => "POST",
      HttpMethod::Put => "PUT",
      HttpMethod::Delete => "DELETE",
    }
  }
}

// ============================================================================
// Request result
// ============================================================================

/// Outcome of one HTTP exchange: status, optional Location header and the
/// parsed JSON body (absent for empty responses).
///
/// The same shape carries a per-operation fragment of a batch response, so
/// result converters work identically for direct and batched calls.
#[derive(Debug, Clone)]
pub struct RequestResult {
  pub status: u16,
  pub location: Option<String>,
  pub body: Option<Value>,
}

impl RequestResult {
  pub fn new(status: u16, location: Option<String>, body: Option<Value>) -> Self {
    Self { status, location, body }
  }

  pub fn status_is(&self, status: u16) -> bool {
    self.status == status
  }

  pub fn status_other_than(&self, status: u16) -> bool {
    self.status != status
  }

  /// Body as a JSON object, or a protocol error naming the context
  pub fn body_object(&self, context: &str) -> Result<&serde_json::Map<String, Value>> {
    self
      .body
      .as_ref()
      .and_then(Value::as_object)
      .ok_or_else(|| RestError::Protocol(format!("{context}: response body is not an object")))
  }

  /// Build the per-operation result carried inside one batch response
  /// fragment. Fragments without an explicit status report 200.
  pub fn from_batch_fragment(entry: &serde_json::Map<String, Value>) -> Self {
    let status = entry
      .get("status")
      .and_then(Value::as_u64)
      .map(|s| s as u16)
      .unwrap_or(200);
    let location = entry
      .get("location")
      .and_then(Value::as_str)
      .map(str::to_string);
    let body = entry.get("body").filter(|b| !b.is_null()).cloned();
    Self { status, location, body }
  }

  /// A fragment counts as carrying a result when it has a body or a
  /// Location header to materialize an entity from.
  pub fn has_payload(&self) -> bool {
    self.body.is_some() || self.location.is_some()
  }
}

// ============================================================================
// Transport trait
// ============================================================================

/// One blocking HTTP exchange with the server.
///
/// Implementations must be cheap to share; the client stores a single
/// instance behind an `Arc` for its whole lifetime.
pub trait Transport: Send + Sync {
  fn send(&self, method: HttpMethod, uri: &str, body: Option<&Value>) -> Result<RequestResult>;
}

// ============================================================================
// URI helpers
// ============================================================================

/// Join a base URI and a suffix with exactly one separating slash.
///
/// An empty suffix returns the base unchanged; a suffix with a leading
/// slash does not double it.
pub fn join_uri(base: &str, suffix: &str) -> String {
  if suffix.is_empty() {
    return base.to_string();
  }
  let base = base.trim_end_matches('/');
  let suffix = suffix.trim_start_matches('/');
  format!("{base}/{suffix}")
}

/// Normalize a server base URI: strip the trailing slash so joins are
/// uniform.
pub fn normalize_base_uri(uri: &str) -> String {
  uri.trim_end_matches('/').to_string()
}

// ============================================================================
// HTTP transport (ureq)
// ============================================================================

/// Production transport over a blocking `ureq` agent
pub struct HttpTransport {
  agent: ureq::Agent,
  auth_header: Option<String>,
}

impl HttpTransport {
  pub fn new() -> Self {
    Self {
      agent: ureq::AgentBuilder::new().build(),
      auth_header: None,
    }
  }

  /// Transport with a basic-auth header on every request
  pub fn with_auth(user: &str, password: &str) -> Self {
    let token = BASE64.encode(format!("{user}:{password}"));
    Self {
      agent: ureq::AgentBuilder::new().build(),
      auth_header: Some(format!("Basic {token}")),
    }
  }
}

impl Default for HttpTransport {
  fn default() -> Self {
    Self::new()
  }
}

impl Transport for HttpTransport {
  fn send(&self, method: HttpMethod, uri: &str, body: Option<&Value>) -> Result<RequestResult> {
    trace!("{} {}", method.as_str(), uri);

    let mut request = self
      .agent
      .request(method.as_str(), uri)
      .set("Accept", "application/json");
    if let Some(header) = &self.auth_header {
      request = request.set("Authorization", header);
    }

    let outcome = match body {
      Some(json) => request.set("Content-Type", "application/json").send_json(json),
      None => request.call(),
    };

    // Non-2xx statuses still carry a response the protocol layer must see
    // (404 lookups, embedded batch errors); only transport-level failures
    // are fatal here.
    let response = match outcome {
      Ok(response) => response,
      Err(ureq::Error::Status(_, response)) => response,
      Err(ureq::Error::Transport(err)) => return Err(RestError::Transport(err.to_string())),
    };

    let status = response.status();
    let location = response.header("Location").map(str::to_string);
    let text = response
      .into_string()
      .map_err(|err| RestError::Transport(err.to_string()))?;
    let body = if text.trim().is_empty() {
      None
    } else {
      Some(serde_json::from_str(&text)?)
    };

    debug!("{} {} -> {}", method.as_str(), uri, status);
    Ok(RequestResult { status, location, body })
  }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_join_uri_single_slash() {
    assert_eq!(join_uri("http://h/db/data", "node"), "http://h/db/data/node");
    assert_eq!(join_uri("http://h/db/data/", "node"), "http://h/db/data/node");
    assert_eq!(join_uri("http://h/db/data", "/node"), "http://h/db/data/node");
    assert_eq!(join_uri("http://h/db/data/", "/node"), "http://h/db/data/node");
  }

  #[test]
  fn test_join_uri_empty_suffix() {
    assert_eq!(join_uri("http://h/db/data", ""), "http://h/db/data");
  }

  #[test]
  fn test_fragment_defaults_status_ok() {
    let entry = json!({"id": 0, "body": {"self": "http://h/db/data/node/1"}});
    let fragment = RequestResult::from_batch_fragment(entry.as_object().unwrap());
    assert_eq!(fragment.status, 200);
    assert!(fragment.has_payload());
  }

  #[test]
  fn test_fragment_null_body_is_no_payload() {
    let entry = json!({"id": 3, "body": null, "status": 204});
    let fragment = RequestResult::from_batch_fragment(entry.as_object().unwrap());
    assert_eq!(fragment.status, 204);
    assert!(!fragment.has_payload());
  }
}
