//! Fluent HTTP request builder with an interceptor pipeline.
//!
//! # Overview
//! A [`Client`] hands out a [`RequestBuilder`] per verb. The caller chains
//! headers, parameters, a body, cookies, credentials and a decode target,
//! then calls [`RequestBuilder::execute`]. The client runs the registered
//! interceptors, negotiates the body, sends the request over its
//! [`Transport`] and decodes the JSON reply into the target.
//!
//! # Design
//! - URL params only affect GET. Other verbs send the explicit body, or
//!   the form params when there is no body. Same-name headers follow
//!   last-write-wins.
//! - The wire request and response are plain data (`HttpRequest`,
//!   `HttpResponse`), so interceptors and test transports can work on them
//!   directly.
//! - Errors after the round trip carry the response, so status and body stay
//!   inspectable when decoding or status classification fails.

pub mod builtin;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod params;
pub mod request;
pub mod transport;

pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use decode::DecodeTarget;
pub use error::ApiError;
pub use http::{BasicAuth, Cookie, HttpMethod, HttpRequest, HttpResponse};
pub use interceptor::{HookError, HookResult, Hooks, Interceptor, Stage};
pub use params::Params;
pub use request::{Body, RequestBuilder, RequestSpec};
pub use transport::{Transport, TransportError, UreqTransport};
