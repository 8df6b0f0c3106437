//! The seam between the client core and the network.
//!
//! # Design
//! The client negotiates an [`HttpRequest`] and hands it to a [`Transport`],
//! which performs exactly one round trip and returns the buffered
//! [`HttpResponse`]. Timeouts, TLS, pooling and redirects are the transport's
//! business. HTTP status codes are never errors at this layer.
//!
//! [`UreqTransport`] is the default. Tests inject fakes.

use std::fmt;
use std::io::Read as _;
use std::time::Duration;

use thiserror::Error;
use ureq::http;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Failures below the HTTP layer. The core never retries them.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Executes one HTTP round trip.
pub trait Transport: Send + Sync + fmt::Debug {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// A blocking [`Transport`] backed by a [`ureq::Agent`].
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// A transport whose single `timeout` covers the whole round trip.
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            // Status classification happens in the client core.
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Wrap a preconfigured agent. It should not treat HTTP status codes as
    /// errors, or non-2xx responses will surface as transport failures.
    pub fn from_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = http::Request::builder()
            .method(request.method.as_str())
            .uri(&request.url);

        for (name, value) in request.wire_headers() {
            builder = builder.header(name, value);
        }

        let result = match request.body {
            Some(body) if carries_body(request.method, &body) => {
                let req = builder.body(body).map_err(|e| TransportError::Other(Box::new(e)))?;
                self.agent.run(req)
            }
            _ => {
                let req = builder.body(()).map_err(|e| TransportError::Other(Box::new(e)))?;
                self.agent.run(req)
            }
        };

        match result {
            Ok(resp) => convert_response(resp),
            Err(ureq::Error::Timeout(_)) => Err(TransportError::Timeout),
            Err(ureq::Error::HostNotFound) => {
                Err(TransportError::Connection("host not found".to_owned()))
            }
            Err(ureq::Error::Io(e)) => Err(TransportError::Io(e)),
            Err(e) => Err(TransportError::Other(Box::new(e))),
        }
    }
}

/// An empty DELETE body is left off the wire entirely.
fn carries_body(method: HttpMethod, body: &[u8]) -> bool {
    match method {
        HttpMethod::Get => false,
        HttpMethod::Delete => !body.is_empty(),
        HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => true,
    }
}

/// Read the body to the end so the connection goes back to the pool.
fn convert_response(response: http::Response<ureq::Body>) -> Result<HttpResponse, TransportError> {
    let (parts, body) = response.into_parts();

    let mut body_bytes = Vec::new();
    body.into_reader().read_to_end(&mut body_bytes)?;

    let headers = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    Ok(HttpResponse {
        status: parts.status.as_u16(),
        status_text: parts.status.canonical_reason().unwrap_or("").to_string(),
        headers,
        body: body_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_get_never_carries_a_body() {
        assert!(!carries_body(HttpMethod::Get, b"x=1"));
        assert!(carries_body(HttpMethod::Post, b""));
        assert!(carries_body(HttpMethod::Patch, b"{}"));
        assert!(!carries_body(HttpMethod::Delete, b""));
        assert!(carries_body(HttpMethod::Delete, b"id=1"));
    }

    #[test]
    fn connection_refused_is_a_transport_error() {
        let transport = UreqTransport::new(Duration::from_secs(2));
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: "http://127.0.0.1:1/".to_string(),
            headers: Vec::new(),
            body: None,
            cookies: Vec::new(),
            basic_auth: None,
        };
        assert!(transport.send(request).is_err());
    }
}
