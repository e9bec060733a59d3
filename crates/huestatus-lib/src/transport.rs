//! HTTP transport — trait + blocking `ureq` backend.
//!
//! The bridge client only needs "send this method/URL/body, give me the status
//! code and body text". Keeping that behind [`Transport`] lets tests swap in
//! [`mock::MockTransport`] and record every request.

use serde_json::Value;

use crate::client::BridgeError;
use crate::protocol::{CONTENT_TYPE, Method};

/// Raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        HttpResponse {
            status: 200,
            body: body.into(),
        }
    }
}

pub trait Transport {
    /// Send one request. `Err` only when no response was received at all;
    /// non-200 responses come back as `Ok` for the caller to classify.
    fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<HttpResponse, BridgeError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<HttpResponse, BridgeError> {
        (**self).send(method, url, body)
    }
}

// ── ureq backend ──

/// Blocking HTTP transport. Uses the agent's default timeouts.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

impl Transport for UreqTransport {
    fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<HttpResponse, BridgeError> {
        log::debug!("[http] {method} {url}");
        let request = self
            .agent
            .request(method.as_str(), url)
            .set("Content-Type", CONTENT_TYPE);

        let result = match body {
            Some(b) => request.send_string(&b.to_string()),
            None => request.call(),
        };

        match result {
            Ok(response) => {
                let status = response.status();
                let body = response
                    .into_string()
                    .map_err(|e| BridgeError::Transport(format!("{method} {url}: reading body: {e}")))?;
                Ok(HttpResponse { status, body })
            }
            Err(ureq::Error::Status(status, response)) => Ok(HttpResponse {
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(e) => Err(BridgeError::Transport(format!("{method} {url}: {e}"))),
        }
    }
}

// ── Mock transport (test-only) ──

pub mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex, MutexGuard};

    /// A request seen by [`MockTransport`].
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedRequest {
        pub method: Method,
        pub url: String,
        pub body: Option<Value>,
    }

    #[derive(Debug, Default)]
    struct MockState {
        /// (method, url) → queued responses. The last queued response is
        /// sticky: it is returned for every further matching call.
        responses: HashMap<(Method, String), VecDeque<HttpResponse>>,
        /// URL prefixes for which no response is received.
        unreachable: Vec<String>,
        requests: Vec<RecordedRequest>,
    }

    /// In-memory transport for tests. Clones share state, so one mock can
    /// serve several bridge clients and still be inspected afterwards.
    ///
    /// Requests without a registered response get `200 []`.
    #[derive(Debug, Clone, Default)]
    pub struct MockTransport {
        state: Arc<Mutex<MockState>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        fn lock(&self) -> MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }

        /// Queue a response for `method` + `url`.
        pub fn respond(&self, method: Method, url: &str, status: u16, body: Value) {
            self.lock()
                .responses
                .entry((method, url.to_string()))
                .or_default()
                .push_back(HttpResponse {
                    status,
                    body: body.to_string(),
                });
        }

        /// Queue a 200 response.
        pub fn respond_ok(&self, method: Method, url: &str, body: Value) {
            self.respond(method, url, 200, body);
        }

        /// Queue a 200 response with a raw (possibly non-JSON) body.
        pub fn respond_raw(&self, method: Method, url: &str, body: &str) {
            self.lock()
                .responses
                .entry((method, url.to_string()))
                .or_default()
                .push_back(HttpResponse::ok(body));
        }

        /// Every request to a URL starting with `prefix` fails without a response.
        pub fn set_unreachable(&self, prefix: &str) {
            self.lock().unreachable.push(prefix.to_string());
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.lock().requests.clone()
        }

        /// Requests made with `method`.
        pub fn requests_with(&self, method: Method) -> Vec<RecordedRequest> {
            self.lock()
                .requests
                .iter()
                .filter(|r| r.method == method)
                .cloned()
                .collect()
        }

        pub fn clear_requests(&self) {
            self.lock().requests.clear();
        }
    }

    impl Transport for MockTransport {
        fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<HttpResponse, BridgeError> {
            let mut state = self.lock();
            state.requests.push(RecordedRequest {
                method,
                url: url.to_string(),
                body: body.cloned(),
            });
            if state.unreachable.iter().any(|p| url.starts_with(p.as_str())) {
                return Err(BridgeError::Transport(format!(
                    "{method} {url}: mock: connection refused"
                )));
            }
            let response = match state.responses.get_mut(&(method, url.to_string())) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            };
            Ok(response.unwrap_or_else(|| HttpResponse::ok("[]")))
        }
    }
}
