//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use serde_json::Value;
use restgraph::{HttpMethod, RequestResult, RestError, Transport};

/// One request the mock saw
#[derive(Debug, Clone)]
pub struct SentRequest {
  pub method: HttpMethod,
  pub uri: String,
  pub body: Option<Value>,
}

enum Scripted {
  Response(RequestResult),
  TransportFailure(String),
}

/// Transport that answers from a scripted queue and records every request
pub struct MockTransport {
  script: Mutex<Vec<Scripted>>,
  sent: Mutex<Vec<SentRequest>>,
}

impl MockTransport {
  pub fn new() -> Self {
    Self {
      script: Mutex::new(Vec::new()),
      sent: Mutex::new(Vec::new()),
    }
  }

  pub fn respond(&self, status: u16, body: Value) -> &Self {
    self
      .script
      .lock()
      .unwrap()
      .push(Scripted::Response(RequestResult::new(status, None, Some(body))));
    self
  }

  pub fn respond_created(&self, location: &str, body: Option<Value>) -> &Self {
    self.script.lock().unwrap().push(Scripted::Response(RequestResult::new(
      201,
      Some(location.to_string()),
      body,
    )));
    self
  }

  pub fn respond_empty(&self, status: u16) -> &Self {
    self
      .script
      .lock()
      .unwrap()
      .push(Scripted::Response(RequestResult::new(status, None, None)));
    self
  }

  pub fn fail_transport(&self, message: &str) -> &Self {
    self
      .script
      .lock()
      .unwrap()
      .push(Scripted::TransportFailure(message.to_string()));
    self
  }

  /// Every request sent so far, in order
  pub fn sent(&self) -> Vec<SentRequest> {
    self.sent.lock().unwrap().clone()
  }

  pub fn request_count(&self) -> usize {
    self.sent.lock().unwrap().len()
  }
}

impl Transport for MockTransport {
  fn send(
    &self,
    method: HttpMethod,
    uri: &str,
    body: Option<&Value>,
  ) -> Result<RequestResult, RestError> {
    self.sent.lock().unwrap().push(SentRequest {
      method,
      uri: uri.to_string(),
      body: body.cloned(),
    });

    let mut script = self.script.lock().unwrap();
    if script.is_empty() {
      panic!("unscripted request: {} {}", method.as_str(), uri);
    }
    match script.remove(0) {
      Scripted::Response(result) => Ok(result),
      Scripted::TransportFailure(message) => Err(RestError::Transport(message)),
    }
  }
}
