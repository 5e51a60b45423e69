//! Blocking HTTP transport backed by ureq.
//!
//! Status codes are never treated as errors here; the client decides what a
//! non-2xx status means. The response body is read to the end before
//! returning, which hands the connection back on every path.

use std::fmt;
use std::time::Duration;

use ureq::Agent;

use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};

#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl UreqTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let body = req.body.as_deref().map(str::as_bytes);
        let result = match req.method {
            HttpMethod::Get => with_headers(self.agent.get(&req.url), &req.headers).call(),
            HttpMethod::Delete => {
                let builder = with_headers(self.agent.delete(&req.url), &req.headers);
                match body {
                    Some(bytes) => builder.force_send_body().send(bytes),
                    None => builder.call(),
                }
            }
            HttpMethod::Post => {
                let builder = with_headers(self.agent.post(&req.url), &req.headers);
                match body {
                    Some(bytes) => builder.send(bytes),
                    None => builder.send_empty(),
                }
            }
            HttpMethod::Put => {
                let builder = with_headers(self.agent.put(&req.url), &req.headers);
                match body {
                    Some(bytes) => builder.send(bytes),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|e| TransportError::new(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError::new(e.to_string()))?;

        Ok(HttpResponse { status, headers, body })
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
