//! Error types returned by `RequestBuilder::execute`.
//!
//! # Design
//! Every failure reaches the caller of `execute`; the core neither logs nor
//! swallows errors. `DecodeError` and `ResponseError` happen after a completed
//! round trip, so they carry the response. A caller can then read the status
//! and raw body whatever went wrong.

use thiserror::Error;

use crate::http::HttpResponse;
use crate::interceptor::{HookError, Stage};
use crate::transport::TransportError;

/// Errors returned by `RequestBuilder::execute`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The verb is not one of GET, POST, PUT, PATCH, DELETE. No I/O happened.
    #[error("invalid HTTP verb {0:?}")]
    InvalidVerb(String),

    /// The request body could not be encoded as JSON. No I/O happened.
    #[error("serialization failed: {0}")]
    SerializationError(#[source] serde_json::Error),

    /// A registered hook failed; later hooks and stages did not run.
    #[error("{stage} interceptor failed: {source}")]
    InterceptorError {
        stage: Stage,
        #[source]
        source: HookError,
    },

    /// The transport could not complete the round trip.
    #[error(transparent)]
    TransportError(#[from] TransportError),

    /// The response body could not be decoded into the requested target.
    #[error("deserialization failed: {source}")]
    DecodeError {
        #[source]
        source: serde_json::Error,
        response: Box<HttpResponse>,
    },

    /// The server answered with a status outside `200..300`.
    #[error("HTTP {status_code}: {status_text}")]
    ResponseError {
        status_code: u16,
        status_text: String,
        response: Box<HttpResponse>,
    },
}

impl ApiError {
    /// The completed response, for errors raised after the round trip.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            ApiError::DecodeError { response, .. } | ApiError::ResponseError { response, .. } => {
                Some(&**response)
            }
            _ => None,
        }
    }

    /// Status code of the completed response, if there was one.
    pub fn status_code(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }
}
