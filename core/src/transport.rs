//! Blocking `Transport` over ureq.
//!
//! Status codes are never turned into errors here: ureq is configured with
//! `http_status_as_error(false)` so 4xx/5xx come back as responses for
//! `check_response` to judge. The shared agent keeps a cookie jar, which is
//! what `Credentials::Include` relies on.
//!
//! Bodies are decoded lossily, so an error response that is not UTF-8
//! still reaches the status check. No size limit applies unless one is set
//! with `with_body_limit`.

use ureq::http::{Request, Response};
use ureq::{Agent, Body};

use crate::error::TransportError;
use crate::http::{Credentials, HttpRequest, HttpResponse, Transport};

#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
    body_limit: u64,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self {
            agent: agent(),
            body_limit: u64::MAX,
        }
    }

    /// Fail with a `TransportError` when a response body exceeds `bytes`.
    pub fn with_body_limit(mut self, bytes: u64) -> Self {
        self.body_limit = bytes;
        self
    }

    fn run(&self, agent: &Agent, req: HttpRequest) -> Result<Response<Body>, TransportError> {
        let mut builder = Request::builder()
            .method(req.method.as_str())
            .uri(req.url.as_str());
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = match req.body {
            Some(body) => {
                let request = builder
                    .body(body)
                    .map_err(|e| TransportError::new(e.to_string()))?;
                agent.run(request)?
            }
            None => {
                let request = builder
                    .body(())
                    .map_err(|e| TransportError::new(e.to_string()))?;
                agent.run(request)?
            }
        };
        Ok(response)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut response = match request.credentials {
            Credentials::Include => self.run(&self.agent, request)?,
            // A throwaway agent has an empty jar and drops whatever it receives.
            Credentials::Omit => self.run(&agent(), request)?,
        };

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let bytes = response
            .body_mut()
            .with_config()
            .limit(self.body_limit)
            .read_to_vec()?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

fn agent() -> Agent {
    Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent()
}
