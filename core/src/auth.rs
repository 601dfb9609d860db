//! Authentication headers supplied per request.
//!
//! The client asks its `AuthHeaders` for a fresh snapshot every time it
//! builds a request and never caches the result. Acquiring or refreshing
//! credentials is the provider's business.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// Source of the current authentication headers.
pub trait AuthHeaders: Send + Sync {
    /// Header name to value; empty when there are no credentials.
    fn auth_headers(&self) -> BTreeMap<String, String>;
}

impl<F> AuthHeaders for F
where
    F: Fn() -> BTreeMap<String, String> + Send + Sync,
{
    fn auth_headers(&self) -> BTreeMap<String, String> {
        self()
    }
}

/// Never adds any headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl AuthHeaders for NoAuth {
    fn auth_headers(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// Holds a bearer token that can be swapped at runtime.
#[derive(Debug, Default)]
pub struct TokenStore {
    token: RwLock<Option<String>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    pub fn clear_token(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuthHeaders for TokenStore {
    fn auth_headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        if let Some(token) = self.token() {
            headers.insert("Authorization".to_string(), format!("Bearer {token}"));
        }
        headers
    }
}
