//! The tenant API client.
//!
//! A [`Client`] owns the base URL, the bearer token, an [`HttpExecutor`] and
//! the [`LockRegistry`]. It is immutable after construction apart from the
//! registry's interior map, so one instance is shared (behind an `Arc`)
//! across every concurrent resource operation.

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::lock::{LockKey, LockRegistry};
use crate::query::Query;
use crate::transport::{HttpExecutor, HttpRequest, HttpResponse, Method, UreqExecutor};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// Structured error envelope returned by the tenant on failure.
#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "errorCode", default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

pub struct Client {
    base_url: String,
    token: String,
    executor: Box<dyn HttpExecutor>,
    locks: LockRegistry,
}

impl Client {
    /// Create a client talking to a real tenant.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_executor(base_url, token, UreqExecutor::new())
    }

    /// Create a client with a custom executor (for testing).
    pub fn with_executor(
        base_url: impl Into<String>,
        token: impl Into<String>,
        executor: impl HttpExecutor + 'static,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            executor: Box::new(executor),
            locks: LockRegistry::new(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The registry serializing requests, exposed for inspection.
    #[must_use]
    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    /// Full URL for an endpoint relative to the tenant base.
    #[must_use]
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Start a paginated query under `key`.
    #[must_use]
    pub fn query(&self, key: LockKey) -> Query<'_> {
        Query::new(self, key)
    }

    pub fn get(&self, cancel: &CancelToken, endpoint: &str, key: LockKey) -> Result<Vec<u8>> {
        self.send(cancel, Method::Get, endpoint, None, key)
    }

    pub fn post<B: Serialize + ?Sized>(
        &self,
        cancel: &CancelToken,
        endpoint: &str,
        body: &B,
        key: LockKey,
    ) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(body)?;
        self.send(cancel, Method::Post, endpoint, Some(body), key)
    }

    pub fn put<B: Serialize + ?Sized>(
        &self,
        cancel: &CancelToken,
        endpoint: &str,
        body: &B,
        key: LockKey,
    ) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(body)?;
        self.send(cancel, Method::Put, endpoint, Some(body), key)
    }

    pub fn patch<B: Serialize + ?Sized>(
        &self,
        cancel: &CancelToken,
        endpoint: &str,
        body: &B,
        key: LockKey,
    ) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(body)?;
        self.send(cancel, Method::Patch, endpoint, Some(body), key)
    }

    pub fn delete(&self, cancel: &CancelToken, endpoint: &str, key: LockKey) -> Result<Vec<u8>> {
        self.send(cancel, Method::Delete, endpoint, None, key)
    }

    /// DELETE carrying a JSON body.
    pub fn delete_with_body<B: Serialize + ?Sized>(
        &self,
        cancel: &CancelToken,
        endpoint: &str,
        body: &B,
        key: LockKey,
    ) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(body)?;
        self.send(cancel, Method::Delete, endpoint, Some(body), key)
    }

    /// GET and decode the response body.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        cancel: &CancelToken,
        endpoint: &str,
        key: LockKey,
    ) -> Result<T> {
        decode(&self.get(cancel, endpoint, key)?)
    }

    /// POST and decode the response body.
    pub fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        cancel: &CancelToken,
        endpoint: &str,
        body: &B,
        key: LockKey,
    ) -> Result<T> {
        decode(&self.post(cancel, endpoint, body, key)?)
    }

    /// PATCH and decode the response body.
    pub fn patch_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        cancel: &CancelToken,
        endpoint: &str,
        body: &B,
        key: LockKey,
    ) -> Result<T> {
        decode(&self.patch(cancel, endpoint, body, key)?)
    }

    fn send(
        &self,
        cancel: &CancelToken,
        method: Method,
        endpoint: &str,
        body: Option<Vec<u8>>,
        key: LockKey,
    ) -> Result<Vec<u8>> {
        let _guard = self.locks.acquire(key.as_str(), cancel)?;
        cancel.check()?;

        let url = self.endpoint_url(endpoint);
        log::debug!("{method} {url} [{key}]");

        let request = HttpRequest {
            method,
            url,
            headers: vec![
                ("Authorization".to_string(), format!("Bearer {}", self.token)),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body,
        };
        let response = self.executor.execute(&request)?;
        cancel.check()?;

        log::trace!(
            "{method} {} -> {} ({} bytes)",
            request.url,
            response.status,
            response.body.len()
        );
        classify(method, &request.url, response)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

/// Map a response status onto the error taxonomy.
fn classify(method: Method, url: &str, response: HttpResponse) -> Result<Vec<u8>> {
    match response.status {
        200..=202 => Ok(response.body),
        204 => Err(Error::NoContent),
        404 => Err(Error::NotFound(format!("{method} {url}"))),
        // Remaining 2xx codes are not used by the tenant; accept them.
        203 | 205..=299 => Ok(response.body),
        status => {
            if let Ok(api) = serde_json::from_slice::<ApiErrorBody>(&response.body)
                && !api.error_code.is_empty()
            {
                return Err(Error::Api {
                    code: api.error_code,
                    message: api.message,
                    status,
                });
            }
            Err(Error::Http {
                method: method.to_string(),
                url: url.to_string(),
                status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            })
        }
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(body)?)
}
