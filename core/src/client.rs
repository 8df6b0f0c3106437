//! The client core: verb entry points and the send pipeline.
//!
//! # Design
//! `Client` holds the configuration, a shared [`Transport`] and the
//! interceptor chain. It is cheap to clone, and clones share all three, so
//! an interceptor registered through one clone applies to all of them.
//!
//! `send_request` runs one request through these steps:
//!
//! 1. request-stage hooks on the [`RequestSpec`]
//! 2. body negotiation into an [`HttpRequest`]
//! 3. raw-request hooks
//! 4. a single transport round trip
//! 5. raw-response hooks
//! 6. JSON decode into the target, if one was given
//! 7. status classification
//!
//! Decoding happens before classification, so an error response still fills
//! the target when its body is valid JSON.

use std::io::Read as _;
use std::sync::Arc;

use tracing::debug;

use crate::config::{ClientConfig, JSON_CONTENT_TYPE};
use crate::decode::decode;
use crate::error::ApiError;
use crate::http::{upsert_header, HttpMethod, HttpRequest, HttpResponse};
use crate::interceptor::{self, Interceptor, InterceptorChain};
use crate::request::{Body, RequestBuilder, RequestSpec};
use crate::transport::{Transport, TransportError, UreqTransport};

const CONTENT_TYPE: &str = "Content-Type";

/// Fluent HTTP client bound to a base URL.
#[derive(Debug, Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    interceptors: Arc<InterceptorChain>,
}

impl Client {
    /// A client with default settings and the ureq transport.
    pub fn new(base_url: &str) -> Self {
        Self::from_config(ClientConfig::builder().base_url(base_url).build())
    }

    pub fn from_config(config: ClientConfig) -> Self {
        let transport = Arc::new(UreqTransport::new(config.timeout));
        Self::with_transport(config, transport)
    }

    /// Use a caller-supplied transport. `config.timeout` is not applied to it.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            interceptors: Arc::new(InterceptorChain::new()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Append an interceptor. Requests already in flight keep the chain they
    /// started with.
    pub fn register_interceptor(&self, interceptor: impl Interceptor + 'static) {
        self.interceptors.register(Arc::new(interceptor));
    }

    pub fn interceptors(&self) -> &InterceptorChain {
        &self.interceptors
    }

    pub fn get(&self, endpoint: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, HttpMethod::Get.as_str(), endpoint)
    }

    pub fn post(&self, endpoint: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, HttpMethod::Post.as_str(), endpoint)
    }

    pub fn put(&self, endpoint: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, HttpMethod::Put.as_str(), endpoint)
    }

    pub fn patch(&self, endpoint: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, HttpMethod::Patch.as_str(), endpoint)
    }

    pub fn delete(&self, endpoint: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, HttpMethod::Delete.as_str(), endpoint)
    }

    /// A request with an arbitrary verb. Verbs outside the supported set
    /// fail at `execute` with [`ApiError::InvalidVerb`].
    pub fn request(&self, verb: impl Into<String>, endpoint: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, verb, endpoint)
    }

    pub(crate) fn send_request(
        &self,
        method: HttpMethod,
        mut spec: RequestSpec<'_>,
    ) -> Result<HttpResponse, ApiError> {
        let chain = self.interceptors.snapshot();

        interceptor::run_request(&chain, &mut spec)?;

        let target = spec.target.take();
        let mut request = self.build_request(method, spec)?;

        interceptor::run_raw_request(&chain, &mut request)?;

        debug!(method = %request.method, url = %request.url, "sending request");
        let mut response = self.transport.send(request)?;
        debug!(status = response.status, bytes = response.body.len(), "received response");

        interceptor::run_raw_response(&chain, &mut response)?;

        if let Err(source) = decode(&response.body, target) {
            return Err(ApiError::DecodeError {
                source,
                response: Box::new(response),
            });
        }

        if !response.is_success() {
            return Err(ApiError::ResponseError {
                status_code: response.status,
                status_text: response.status_text.clone(),
                response: Box::new(response),
            });
        }

        Ok(response)
    }

    /// Turn a spec into a wire request.
    ///
    /// GET encodes URL params into the query string and sends no body. Other
    /// verbs send the explicit body if there is one, otherwise the encoded
    /// form params. Spec headers are applied last so they override the
    /// computed Content-Type.
    fn build_request(&self, method: HttpMethod, spec: RequestSpec<'_>) -> Result<HttpRequest, ApiError> {
        let RequestSpec {
            endpoint,
            url_params,
            form_params,
            headers: spec_headers,
            cookies,
            body,
            basic_auth,
            ..
        } = spec;

        let mut url = format!("{}{}", self.config.base_url, endpoint);
        let mut headers = Vec::new();

        let body = match method {
            HttpMethod::Get => {
                if !url_params.is_empty() {
                    url.push(if url.contains('?') { '&' } else { '?' });
                    url.push_str(&url_params.encode());
                }
                None
            }
            _ => Some(match body {
                Some(Body::Json(value)) => {
                    upsert_header(&mut headers, CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string());
                    value.to_json().map_err(ApiError::SerializationError)?
                }
                Some(Body::Bytes(bytes)) => bytes,
                Some(Body::Text(text)) => text.into_bytes(),
                Some(Body::Reader(mut reader)) => {
                    let mut buf = Vec::new();
                    reader.read_to_end(&mut buf).map_err(TransportError::Io)?;
                    buf
                }
                None => {
                    upsert_header(&mut headers, CONTENT_TYPE.to_string(), self.config.content_type.clone());
                    form_params.encode().into_bytes()
                }
            }),
        };

        for (name, value) in spec_headers {
            upsert_header(&mut headers, name, value);
        }

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
            cookies,
            basic_auth,
        })
    }
}
