//! Scriptable transport for tests and offline use.
//!
//! Routes are matched on method and URL suffix. Each route holds a queue of
//! replies; the last reply repeats once the queue is drained. Unmatched
//! requests get `404 Not Found` with body `Not Found`.
//!
//! ```ignore
//! let transport = MockTransport::new()
//!     .route(Method::GET, "/api/v1/instruments/", MockReply::json(200, json!([])))
//!     .route(Method::POST, "/api/v1/orders/", MockReply::text(500, "boom"));
//! ```

use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::error::ApiError;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// One scripted outcome.
#[derive(Debug, Clone)]
pub enum MockReply {
    Respond(HttpResponse),
    Fail(String),
}

impl MockReply {
    /// Respond with a JSON body.
    pub fn json(status: u16, body: Value) -> Self {
        Self::text(status, body.to_string())
    }

    /// Respond with a raw text body.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::Respond(HttpResponse {
            status,
            status_text: status_text(status),
            body: body.into(),
        })
    }

    /// Fail without a response, like a refused connection.
    pub fn transport_error(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }
}

struct Route {
    method: Method,
    path: String,
    replies: VecDeque<MockReply>,
    gate: Option<Arc<Notify>>,
}

impl Route {
    fn matches(&self, request: &HttpRequest) -> bool {
        self.method == request.method && request.url.ends_with(&self.path)
    }

    fn next_reply(&mut self) -> MockReply {
        if self.replies.len() > 1 {
            if let Some(reply) = self.replies.pop_front() {
                return reply;
            }
        }
        self.replies.front().cloned().unwrap_or_else(not_found)
    }
}

/// Recording transport with scripted replies.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for a route.
    pub fn route(self, method: Method, path: &str, reply: MockReply) -> Self {
        self.push_reply(method, path, reply, None);
        self
    }

    /// Queue a reply that is only released once `gate` is notified.
    pub fn gated_route(self, method: Method, path: &str, reply: MockReply, gate: Arc<Notify>) -> Self {
        self.push_reply(method, path, reply, Some(gate));
        self
    }

    /// Queue another reply on an existing or new route.
    pub fn push_reply(&self, method: Method, path: &str, reply: MockReply, gate: Option<Arc<Notify>>) {
        let mut routes = lock(&self.routes);
        if let Some(route) = routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path)
        {
            route.replies.push_back(reply);
            if gate.is_some() {
                route.gate = gate;
            }
            return;
        }
        routes.push(Route {
            method,
            path: path.to_string(),
            replies: VecDeque::from([reply]),
            gate,
        });
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// Number of requests received for a method and URL suffix.
    pub fn count(&self, method: Method, path: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|r| r.method == method && r.url.ends_with(path))
            .count()
    }

    /// Most recent request for a method and URL suffix.
    pub fn last_request(&self, method: Method, path: &str) -> Option<HttpRequest> {
        lock(&self.requests)
            .iter()
            .rev()
            .find(|r| r.method == method && r.url.ends_with(path))
            .cloned()
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let (reply, gate) = {
            let mut routes = lock(&self.routes);
            match routes.iter_mut().find(|r| r.matches(&request)) {
                Some(route) => (route.next_reply(), route.gate.clone()),
                None => (not_found(), None),
            }
        };
        lock(&self.requests).push(request);

        if let Some(gate) = gate {
            gate.notified().await;
        }

        match reply {
            MockReply::Respond(response) => Ok(response),
            MockReply::Fail(message) => Err(ApiError::Transport(message)),
        }
    }
}

fn not_found() -> MockReply {
    MockReply::text(404, "Not Found")
}

fn status_text(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or_default()
        .to_string()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
