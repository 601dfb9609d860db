//! Request executor for the `/api` surface.
//!
//! # Design
//! `ApiClient` holds an origin, an auth header provider and a transport, and
//! carries no mutable state between calls. Request construction is split
//! from execution: `build_*` produces an `HttpRequest` without I/O, and
//! `api_request*` sends it and runs the status check. Headers are built from
//! scratch for every request.
//!
//! Writes return the raw `HttpResponse`; only the query path (see
//! `crate::query`) parses bodies as JSON.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::AuthHeaders;
use crate::error::ApiError;
use crate::http::{Credentials, HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::query::{DefaultQueryFn, UnauthorizedBehavior};
use crate::url::{api_url, ApiPath};

/// Synchronous client for the application's JSON API.
#[derive(Clone)]
pub struct ApiClient {
    origin: String,
    auth: Arc<dyn AuthHeaders>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// `origin` is joined in front of every non-absolute path, e.g.
    /// `http://localhost:3000`. A trailing `/` is dropped.
    pub fn new(origin: &str, auth: Arc<dyn AuthHeaders>, transport: Arc<dyn Transport>) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            auth,
            transport,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Normalize `path` and join it onto the origin unless it is absolute.
    pub fn resolve(&self, path: &str) -> String {
        let url = api_url(path);
        match ApiPath::classify(&url) {
            ApiPath::Absolute => url,
            ApiPath::Namespaced | ApiPath::Bare => format!("{}{url}", self.origin),
        }
    }

    /// Build a request without a body.
    pub fn build_request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        self.build(method, path, None)
    }

    /// Build a request carrying `data` as its JSON body.
    pub fn build_json_request<T>(
        &self,
        method: HttpMethod,
        path: &str,
        data: &T,
    ) -> Result<HttpRequest, ApiError>
    where
        T: Serialize + ?Sized,
    {
        let body = serde_json::to_string(data)?;
        Ok(self.build(method, path, Some(body)))
    }

    fn build(&self, method: HttpMethod, path: &str, body: Option<String>) -> HttpRequest {
        let mut headers = Vec::new();
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        headers.extend(self.auth.auth_headers());

        HttpRequest {
            method,
            url: self.resolve(path),
            headers,
            body,
            credentials: Credentials::Include,
        }
    }

    /// Send a request without a body and fail on any non-2xx status.
    pub fn api_request(&self, method: HttpMethod, path: &str) -> Result<HttpResponse, ApiError> {
        let request = self.build_request(method, path);
        check_response(self.send(request)?)
    }

    /// Send `data` as JSON and fail on any non-2xx status.
    pub fn api_request_json<T>(
        &self,
        method: HttpMethod,
        path: &str,
        data: &T,
    ) -> Result<HttpResponse, ApiError>
    where
        T: Serialize + ?Sized,
    {
        let request = self.build_json_request(method, path, data)?;
        check_response(self.send(request)?)
    }

    /// Execute a prepared request as-is, without the status check.
    pub fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(
            method = %request.method,
            url = %request.url,
            has_body = request.body.is_some(),
            "sending request"
        );
        let response = self.transport.execute(request)?;
        debug!(status = response.status, "received response");
        Ok(response)
    }

    /// Default query function over this client.
    pub fn query_fn(&self, on_401: UnauthorizedBehavior) -> DefaultQueryFn {
        DefaultQueryFn::new(self.clone(), on_401)
    }
}

/// Pass 2xx responses through; turn anything else into `RequestFailed`.
pub fn check_response(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    let text = if response.body.is_empty() {
        response.status_text
    } else {
        response.body
    };
    warn!(status = response.status, "request failed");
    Err(ApiError::RequestFailed {
        status: response.status,
        text,
    })
}
