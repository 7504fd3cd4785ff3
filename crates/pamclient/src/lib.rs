//! # pamclient
//!
//! Blocking client for the REST API of a privileged-access-management
//! tenant.
//!
//! Requests are serialized per domain through a keyed lock registry owned
//! by the [`Client`]: two operations on profiles never overlap, while a
//! profile operation and a tag operation run side by side. Responses are
//! classified into a small error taxonomy ([`ErrorCategory`]) so callers
//! can tell "gone" from "rejected" from "network trouble".
//!
//! ## Example
//!
//! ```no_run
//! use pamclient::{CancelToken, Client};
//!
//! let client = Client::new("https://tenant.example/api", "token");
//! let cancel = CancelToken::new();
//! let app = client.application_by_name(&cancel, "crm")?;
//! println!("{}: {}", app.id, app.version);
//! # Ok::<(), pamclient::Error>(())
//! ```
//!
//! ## Testing
//!
//! [`transport::MockExecutor`] replays scripted responses and records the
//! requests it receives:
//!
//! ```
//! use pamclient::transport::{Method, MockExecutor};
//! use pamclient::{CancelToken, Client, LockKey};
//!
//! let mock = MockExecutor::new();
//! mock.respond(Method::Get, "/apps/a1", 404, "");
//! let client = Client::with_executor("https://t.example", "tok", mock.clone());
//!
//! let err = client.get(&CancelToken::new(), "apps/a1", LockKey::Application).unwrap_err();
//! assert!(err.is_not_found());
//! ```

#![warn(clippy::all)]

pub mod cancel;
pub mod catalog;
pub mod client;
pub mod error;
pub mod lock;
pub mod models;
pub mod priority;
pub mod query;
pub mod resolver;
pub mod settings;
pub mod transport;

pub use cancel::CancelToken;
pub use client::Client;
pub use error::{AllowNoContent, Error, ErrorCategory, NotFoundAsNone, Result};
pub use lock::{LockKey, LockRegistry};
pub use query::{Query, SortOrder, eq_filter};
pub use settings::EntityKind;
