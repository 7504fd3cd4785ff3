//! Paginated list queries.
//!
//! List endpoints return an envelope `{count, page, size, data}`. A
//! [`Query`] walks pages from 0 until `count <= (page + 1) * size`,
//! converting every element of `data` into the caller's element type.
//!
//! ```no_run
//! use pamclient::{CancelToken, Client, LockKey, query::eq_filter};
//! use pamclient::models::Tag;
//!
//! let client = Client::new("https://tenant.example/api", "token");
//! let tags: Vec<Tag> = client
//!     .query(LockKey::Tag)
//!     .with_filter(eq_filter("name", "prod"))
//!     .with_size(50)
//!     .fetch(&CancelToken::new(), "tags")
//!     .unwrap();
//! ```

use crate::cancel::CancelToken;
use crate::client::Client;
use crate::error::Result;
use crate::lock::LockKey;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Default page size.
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// One page of a list response.
#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    count: usize,
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

/// URL-encoded `{field} eq "{value}"` filter.
pub fn eq_filter(field: &str, value: &str) -> String {
    urlencoding::encode(&format!("{field} eq \"{value}\"")).into_owned()
}

/// Fluent builder for a paginated list request.
#[derive(Debug)]
pub struct Query<'a> {
    client: &'a Client,
    key: LockKey,
    filter: Option<String>,
    sort: Option<(String, SortOrder)>,
    size: usize,
    params: Vec<(String, String)>,
}

impl<'a> Query<'a> {
    pub(crate) fn new(client: &'a Client, key: LockKey) -> Self {
        Self {
            client,
            key,
            filter: None,
            sort: None,
            size: DEFAULT_PAGE_SIZE,
            params: Vec::new(),
        }
    }

    /// Filter expression, already URL-encoded.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    /// Page size; zero falls back to the default.
    #[must_use]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = if size == 0 { DEFAULT_PAGE_SIZE } else { size };
        self
    }

    /// Extra query parameter, encoded on the way out.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Fetch every page of `endpoint` and collect the elements.
    pub fn fetch<T: DeserializeOwned>(&self, cancel: &CancelToken, endpoint: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 0;
        loop {
            let url = self.page_url(endpoint, page);
            let envelope: Page = self.client.get_json(cancel, &url, self.key)?;
            let received = envelope.data.len();
            for element in envelope.data {
                items.push(serde_json::from_value(element)?);
            }
            log::trace!(
                "{endpoint}: page {page} returned {received} of {}",
                envelope.count
            );
            if envelope.count <= (page + 1) * self.size || received == 0 {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    fn page_url(&self, endpoint: &str, page: usize) -> String {
        let mut url = endpoint.to_string();
        url.push(if endpoint.contains('?') { '&' } else { '?' });
        url.push_str(&format!("page={page}&size={}", self.size));
        if let Some(filter) = &self.filter {
            url.push_str(&format!("&filter={filter}"));
        }
        if let Some((field, order)) = &self.sort {
            url.push_str(&format!(
                "&sort={}",
                urlencoding::encode(&format!("{field} {}", order.as_str()))
            ));
        }
        for (name, value) in &self.params {
            url.push_str(&format!(
                "&{}={}",
                urlencoding::encode(name),
                urlencoding::encode(value)
            ));
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, MockExecutor};
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    fn page(count: usize, page: usize, size: usize, ids: &[&str]) -> serde_json::Value {
        json!({
            "count": count,
            "page": page,
            "size": size,
            "data": ids.iter().map(|id| json!({"id": id, "extra": true})).collect::<Vec<_>>(),
        })
    }

    #[test]
    fn test_eq_filter_encoding() {
        assert_eq!(eq_filter("name", "a b"), "name%20eq%20%22a%20b%22");
    }

    #[test]
    fn test_accumulates_all_pages() {
        let mock = MockExecutor::new();
        mock.respond_json(Method::Get, "/tags?page=0&size=2", 200, &page(5, 0, 2, &["a", "b"]));
        mock.respond_json(Method::Get, "/tags?page=1&size=2", 200, &page(5, 1, 2, &["c", "d"]));
        mock.respond_json(Method::Get, "/tags?page=2&size=2", 200, &page(5, 2, 2, &["e"]));
        let client = Client::with_executor("https://t.example", "tok", mock.clone());

        let items: Vec<Item> = client
            .query(LockKey::Tag)
            .with_size(2)
            .fetch(&CancelToken::new(), "tags")
            .unwrap();

        assert_eq!(items.len(), 5);
        assert_eq!(items[4], Item { id: "e".to_string() });
        assert_eq!(mock.requests().len(), 3);
    }

    #[test]
    fn test_single_page_default_size() {
        let mock = MockExecutor::new();
        mock.respond_json(
            Method::Get,
            "/apps?page=0&size=10&filter=name%20eq%20%22x%22",
            200,
            &page(1, 0, 10, &["a1"]),
        );
        let client = Client::with_executor("https://t.example", "tok", mock.clone());

        let items: Vec<Item> = client
            .query(LockKey::Application)
            .with_filter(eq_filter("name", "x"))
            .fetch(&CancelToken::new(), "apps")
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn test_sort_and_params() {
        let mock = MockExecutor::new();
        let client = Client::with_executor("https://t.example", "tok", mock);
        let query = client
            .query(LockKey::Policy)
            .with_sort("priority", SortOrder::Asc)
            .with_param("type", "access policy");
        assert_eq!(
            query.page_url("paps/p1/policies?x=1", 0),
            "paps/p1/policies?x=1&page=0&size=10&sort=priority%20asc&type=access%20policy"
        );
    }

    #[test]
    fn test_stops_on_empty_page() {
        let mock = MockExecutor::new();
        mock.respond_json(Method::Get, "/roles?page=0&size=10", 200, &page(50, 0, 10, &[]));
        let client = Client::with_executor("https://t.example", "tok", mock.clone());

        let items: Vec<Item> = client
            .query(LockKey::Role)
            .fetch(&CancelToken::new(), "roles")
            .unwrap();
        assert!(items.is_empty());
        assert_eq!(mock.requests().len(), 1);
    }
}
