//! HTTP executors.
//!
//! The [`HttpExecutor`] trait is the seam between the client and the wire.
//! [`UreqExecutor`] talks to a real tenant; [`MockExecutor`] replays canned
//! responses and records requests so client behaviour can be tested without
//! network access.
//!
//! ```
//! use pamclient::transport::{HttpExecutor, HttpRequest, Method, MockExecutor};
//!
//! let mock = MockExecutor::new();
//! mock.respond(Method::Get, "/apps/a1", 200, r#"{"id":"a1"}"#);
//!
//! let response = mock
//!     .execute(&HttpRequest::new(Method::Get, "https://t.example/apps/a1"))
//!     .unwrap();
//! assert_eq!(response.status, 200);
//! assert_eq!(mock.requests().len(), 1);
//! ```

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// HTTP methods used by the tenant API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built request.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded as JSON, for assertions.
    pub fn json(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_slice(body).ok())
    }
}

// Headers carry the bearer token; keep it out of debug output.
impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("body_len", &self.body.as_ref().map_or(0, Vec::len))
            .finish_non_exhaustive()
    }
}

/// Status and raw body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends one request and returns the raw response.
///
/// Implementations return every status as a response; only
/// connection-level failures are errors. Status classification belongs to
/// the client.
pub trait HttpExecutor: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Executor backed by a `ureq` agent with no request timeout.
pub struct UreqExecutor {
    agent: ureq::Agent,
}

impl UreqExecutor {
    #[must_use]
    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(None)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for UreqExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpExecutor for UreqExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = request.url.as_str();
        let body = request.body.as_deref().unwrap_or_default();

        let result = match request.method {
            Method::Get => with_headers(self.agent.get(url), &request.headers).call(),
            Method::Delete if request.body.is_some() => {
                with_headers(self.agent.delete(url), &request.headers)
                    .force_send_body()
                    .send(body)
            }
            Method::Delete => with_headers(self.agent.delete(url), &request.headers).call(),
            Method::Post => with_headers(self.agent.post(url), &request.headers).send(body),
            Method::Put => with_headers(self.agent.put(url), &request.headers).send(body),
            Method::Patch => with_headers(self.agent.patch(url), &request.headers).send(body),
        };

        let mut response = result.map_err(|e| Error::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

struct Route {
    method: Method,
    path: String,
    responses: VecDeque<HttpResponse>,
}

#[derive(Default)]
struct MockState {
    routes: Vec<Route>,
    requests: Vec<HttpRequest>,
}

/// Scripted executor for tests.
///
/// Responses are matched by method and by the request URL ending with the
/// scripted path (query string included). Several responses scripted for
/// one route are replayed in order; the last one repeats.
#[derive(Clone, Default)]
pub struct MockExecutor {
    state: Arc<Mutex<MockState>>,
    latency: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response, to widen race windows in concurrency tests.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Script a response for `method` on URLs ending with `path`.
    pub fn respond(&self, method: Method, path: &str, status: u16, body: &str) {
        let response = HttpResponse::new(status, body.as_bytes());
        let mut state = self.state.lock();
        if let Some(route) = state
            .routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path)
        {
            route.responses.push_back(response);
            return;
        }
        state.routes.push(Route {
            method,
            path: path.to_string(),
            responses: VecDeque::from([response]),
        });
    }

    /// Script a JSON response.
    pub fn respond_json(&self, method: Method, path: &str, status: u16, body: &serde_json::Value) {
        self.respond(method, path, status, &body.to_string());
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().requests.clone()
    }

    /// Requests with the given method whose URL contains `needle`.
    pub fn requests_to(&self, method: Method, needle: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.url.contains(needle))
            .collect()
    }

    /// Highest number of requests that were executing at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self, request: &HttpRequest) -> Option<HttpResponse> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());
        let route = state
            .routes
            .iter_mut()
            .filter(|r| r.method == request.method && request.url.ends_with(&r.path))
            .max_by_key(|r| r.path.len())?;
        if route.responses.len() > 1 {
            route.responses.pop_front()
        } else {
            route.responses.front().cloned()
        }
    }
}

impl HttpExecutor for MockExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let response = self.next_response(request);
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        response.ok_or_else(|| {
            Error::Transport(format!(
                "no scripted response for {} {}",
                request.method, request.url
            ))
        })
    }
}
