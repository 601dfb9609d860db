//! Request helper and query client for the application's `/api` surface.
//!
//! # Overview
//! `ApiClient` normalizes paths onto `/api`, attaches auth headers and JSON
//! bodies, and turns non-2xx responses into `ApiError::RequestFailed`.
//! `QueryClient` caches reads made through a `QueryFn`, by default the one
//! `ApiClient::query_fn` builds.
//!
//! # Design
//! - Requests and responses are plain data (`http`); a `Transport` performs
//!   the round-trip. `UreqTransport` is the stock one (feature `ureq`).
//! - Writes return the raw response, reads parse JSON.
//! - 401 handling on reads is an explicit `UnauthorizedBehavior`.
//! - No global client: build `ApiClient` and `QueryClient` at startup (see
//!   `ClientConfig`) and pass them by reference.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod query;
pub mod query_client;
#[cfg(feature = "ureq")]
pub mod transport;
pub mod url;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AuthHeaders, NoAuth, TokenStore};
pub use client::{check_response, ApiClient};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, TransportError};
pub use http::{Credentials, HttpMethod, HttpRequest, HttpResponse, Transport, UnknownMethod};
pub use query::{DefaultQueryFn, QueryFn, QueryKey, UnauthorizedBehavior};
pub use query_client::{DefaultOptions, MutationOptions, QueryClient, QueryOptions, StaleTime};
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use url::{api_url, ApiPath};
