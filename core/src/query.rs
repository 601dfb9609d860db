//! Read path: query keys and query functions.
//!
//! # Design
//! A query function turns a `QueryKey` into a JSON value. The default one,
//! built by `ApiClient::query_fn`, GETs the path in the key's first element
//! and parses the body. What happens on 401 is an explicit
//! `UnauthorizedBehavior` chosen when the function is built.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::client::{check_response, ApiClient};
use crate::error::ApiError;
use crate::http::HttpMethod;

const UNAUTHORIZED: u16 = 401;

/// What a query does when the server answers 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnauthorizedBehavior {
    /// Resolve to JSON `null`.
    ReturnNull,
    /// Fail with `RequestFailed` like any other error status.
    Throw,
}

/// Cache key for a query. The first element is the request path; further
/// elements only distinguish cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new(path: impl Into<String>) -> Self {
        Self(vec![path.into()])
    }

    /// Append a discriminating segment.
    pub fn with(mut self, segment: impl Into<String>) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn path(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// True when `prefix`'s segments are a leading run of this key's.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

impl From<&str> for QueryKey {
    fn from(path: &str) -> Self {
        QueryKey::new(path)
    }
}

impl From<String> for QueryKey {
    fn from(path: String) -> Self {
        QueryKey::new(path)
    }
}

impl From<Vec<String>> for QueryKey {
    fn from(segments: Vec<String>) -> Self {
        QueryKey(segments)
    }
}

impl<const N: usize> From<[&str; N]> for QueryKey {
    fn from(segments: [&str; N]) -> Self {
        QueryKey(segments.iter().map(|s| s.to_string()).collect())
    }
}

/// Fetches the data for a query key.
pub trait QueryFn: Send + Sync {
    fn fetch(&self, key: &QueryKey) -> Result<Value, ApiError>;
}

impl<F> QueryFn for F
where
    F: Fn(&QueryKey) -> Result<Value, ApiError> + Send + Sync,
{
    fn fetch(&self, key: &QueryKey) -> Result<Value, ApiError> {
        self(key)
    }
}

/// GETs the key's path through an `ApiClient` and parses the JSON body.
#[derive(Debug, Clone)]
pub struct DefaultQueryFn {
    api: ApiClient,
    on_401: UnauthorizedBehavior,
}

impl DefaultQueryFn {
    pub fn new(api: ApiClient, on_401: UnauthorizedBehavior) -> Self {
        Self { api, on_401 }
    }

    pub fn on_401(&self) -> UnauthorizedBehavior {
        self.on_401
    }
}

impl QueryFn for DefaultQueryFn {
    fn fetch(&self, key: &QueryKey) -> Result<Value, ApiError> {
        let path = key.path().ok_or(ApiError::EmptyQueryKey)?;
        let request = self.api.build_request(HttpMethod::Get, path);
        let response = self.api.send(request)?;

        if self.on_401 == UnauthorizedBehavior::ReturnNull && response.status == UNAUTHORIZED {
            debug!(%key, "unauthorized, resolving to null");
            return Ok(Value::Null);
        }

        let response = check_response(response)?;
        Ok(serde_json::from_str(&response.body)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::auth::TokenStore;
    use crate::http::Credentials;
    use crate::testing::StubTransport;

    fn api(transport: &StubTransport) -> ApiClient {
        ApiClient::new(
            "http://localhost:3000",
            Arc::new(TokenStore::with_token("secret")),
            Arc::new(transport.clone()),
        )
    }

    #[test]
    fn success_parses_json() {
        let transport = StubTransport::new().respond(200, "OK", r#"{"a":1}"#);
        let value = api(&transport)
            .query_fn(UnauthorizedBehavior::Throw)
            .fetch(&"/a".into())
            .unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn request_is_a_plain_authenticated_get() {
        let transport = StubTransport::new().respond(200, "OK", "[]");
        api(&transport)
            .query_fn(UnauthorizedBehavior::Throw)
            .fetch(&QueryKey::from(["todos", "page-1"]))
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/api/todos");
        assert!(req.body.is_none());
        assert_eq!(req.header("content-type"), None);
        assert_eq!(req.header("authorization"), Some("Bearer secret"));
        assert_eq!(req.credentials, Credentials::Include);
    }

    #[test]
    fn unauthorized_returns_null_when_asked() {
        let transport = StubTransport::new().respond(401, "Unauthorized", "login required");
        let value = api(&transport)
            .query_fn(UnauthorizedBehavior::ReturnNull)
            .fetch(&"/me".into())
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn unauthorized_throws_by_request() {
        let transport = StubTransport::new().respond(401, "Unauthorized", "");
        let err = api(&transport)
            .query_fn(UnauthorizedBehavior::Throw)
            .fetch(&"/me".into())
            .unwrap_err();
        assert!(err.to_string().starts_with("401:"));
        assert_eq!(err.to_string(), "401: Unauthorized");
    }

    #[test]
    fn return_null_does_not_mask_other_errors() {
        let transport = StubTransport::new().respond(403, "Forbidden", "nope");
        let err = api(&transport)
            .query_fn(UnauthorizedBehavior::ReturnNull)
            .fetch(&"/me".into())
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn invalid_json_surfaces_parse_error() {
        let transport = StubTransport::new().respond(200, "OK", "not json");
        let err = api(&transport)
            .query_fn(UnauthorizedBehavior::Throw)
            .fetch(&"/a".into())
            .unwrap_err();
        assert!(matches!(err, ApiError::Json(_)));
    }

    #[test]
    fn empty_key_is_rejected_without_io() {
        let transport = StubTransport::new();
        let err = api(&transport)
            .query_fn(UnauthorizedBehavior::Throw)
            .fetch(&QueryKey::from(Vec::<String>::new()))
            .unwrap_err();
        assert!(matches!(err, ApiError::EmptyQueryKey));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn key_prefix_matching() {
        let key = QueryKey::from(["todos", "42"]);
        assert!(key.starts_with(&"todos".into()));
        assert!(!key.starts_with(&"todo".into()));
        assert_eq!(key.to_string(), "[todos, 42]");
    }

    #[test]
    fn unauthorized_behavior_uses_camel_case_names() {
        let parsed: UnauthorizedBehavior = serde_json::from_str(r#""returnNull""#).unwrap();
        assert_eq!(parsed, UnauthorizedBehavior::ReturnNull);
    }
}
