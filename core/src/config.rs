//! Startup configuration for the client pair.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::AuthHeaders;
use crate::client::ApiClient;
use crate::http::Transport;
use crate::query::UnauthorizedBehavior;
use crate::query_client::{DefaultOptions, QueryClient};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where the API lives and how its queries are cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Joined in front of every `/api` path, e.g. `http://localhost:3000`.
    pub origin: String,
    #[serde(default)]
    pub defaults: DefaultOptions,
}

impl ClientConfig {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            defaults: DefaultOptions::default(),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Build the request client and a query client whose default query
    /// function treats 401 as an error.
    pub fn into_clients(
        self,
        auth: Arc<dyn AuthHeaders>,
        transport: Arc<dyn Transport>,
    ) -> (ApiClient, QueryClient) {
        let api = ApiClient::new(&self.origin, auth, transport);
        let query_fn = Arc::new(api.query_fn(UnauthorizedBehavior::Throw));
        let queries = QueryClient::with_options(query_fn, self.defaults);
        (api, queries)
    }
}
