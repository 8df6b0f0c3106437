//! Request accumulation: [`RequestSpec`] and its fluent [`RequestBuilder`].
//!
//! # Design
//! Mutators never validate. The verb, the JSON body and the response target
//! are all checked or used only when [`RequestBuilder::execute`] runs. The
//! decode target is borrowed for the builder's lifetime `'a`, so the borrow
//! checker keeps it alive until the send completes.

use std::fmt;
use std::io::Read;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::Client;
use crate::decode::DecodeTarget;
use crate::error::ApiError;
use crate::http::{find_header, upsert_header, BasicAuth, Cookie, HttpMethod, HttpResponse};
use crate::params::Params;

/// A structured value to be JSON-encoded when the request is sent.
pub trait JsonPayload {
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;
}

impl<T: Serialize> JsonPayload for T {
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Request payload. Any body takes precedence over form parameters.
pub enum Body<'a> {
    /// Sent verbatim; the caller declares the content type.
    Bytes(Vec<u8>),
    /// Sent verbatim as UTF-8; the caller declares the content type.
    Text(String),
    /// Drained fully before dispatch; the caller declares the content type.
    Reader(Box<dyn Read + Send + 'a>),
    /// Encoded at send time, sent as `application/json`.
    Json(Box<dyn JsonPayload + 'a>),
}

impl<'a> Body<'a> {
    pub fn json<T: Serialize + 'a>(value: T) -> Self {
        Body::Json(Box::new(value))
    }

    pub fn reader<R: Read + Send + 'a>(reader: R) -> Self {
        Body::Reader(Box::new(reader))
    }
}

impl From<Vec<u8>> for Body<'_> {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<&[u8]> for Body<'_> {
    fn from(bytes: &[u8]) -> Self {
        Body::Bytes(bytes.to_vec())
    }
}

impl From<String> for Body<'_> {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body<'_> {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl fmt::Debug for Body<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Body::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Body::Reader(_) => f.write_str("Reader"),
            Body::Json(_) => f.write_str("Json"),
        }
    }
}

/// Everything known about one request before it is sent.
///
/// Request-stage interceptors receive it mutably and may change any field
/// except the verb.
pub struct RequestSpec<'a> {
    pub(crate) verb: String,
    pub endpoint: String,
    pub url_params: Params,
    pub form_params: Params,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<Cookie>,
    pub body: Option<Body<'a>>,
    pub basic_auth: Option<BasicAuth>,
    pub target: Option<&'a mut dyn DecodeTarget>,
}

impl<'a> RequestSpec<'a> {
    pub fn new(verb: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            endpoint: endpoint.into(),
            url_params: Params::new(),
            form_params: Params::new(),
            headers: Vec::new(),
            cookies: Vec::new(),
            body: None,
            basic_auth: None,
            target: None,
        }
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Last write wins, case-insensitively.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        upsert_header(&mut self.headers, name.into(), value.into());
    }

    pub fn set_body(&mut self, body: impl Into<Body<'a>>) {
        self.body = Some(body.into());
    }
}

impl fmt::Debug for RequestSpec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSpec")
            .field("verb", &self.verb)
            .field("endpoint", &self.endpoint)
            .field("url_params", &self.url_params)
            .field("form_params", &self.form_params)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("body", &self.body)
            .field("basic_auth", &self.basic_auth)
            .field("target", &self.target.is_some())
            .finish()
    }
}

/// Fluent builder bound to a [`Client`].
///
/// ```no_run
/// # use chainreq::Client;
/// # #[derive(Default, serde::Deserialize)] struct User { id: i64 }
/// let client = Client::new("http://localhost:3000");
/// let mut user = User::default();
/// let response = client
///     .get("/users")
///     .with_url_param("id", "1")
///     .into(&mut user)
///     .execute()?;
/// assert_eq!(response.status, 200);
/// # Ok::<(), chainreq::ApiError>(())
/// ```
#[must_use = "a request does nothing until `execute` is called"]
pub struct RequestBuilder<'a> {
    client: &'a Client,
    spec: RequestSpec<'a>,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(client: &'a Client, verb: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            spec: RequestSpec::new(verb, endpoint),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.set_header(key, value);
        self
    }

    /// Query parameter; only GET requests encode these.
    pub fn with_url_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.url_params.add(key, value);
        self
    }

    /// Form parameter; encoded as the body of non-GET requests without a body.
    pub fn with_form_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.form_params.add(key, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body<'a>>) -> Self {
        self.spec.set_body(body);
        self
    }

    /// Shorthand for `with_body(Body::json(value))`.
    pub fn with_json<T: Serialize + 'a>(self, value: T) -> Self {
        self.with_body(Body::json(value))
    }

    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.spec.cookies.push(cookie);
        self
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.spec.basic_auth = Some(BasicAuth::new(username, password));
        self
    }

    /// Decode the response body into `target` when the request completes.
    #[allow(clippy::should_implement_trait)]
    pub fn into<T: DeserializeOwned>(mut self, target: &'a mut T) -> Self {
        self.spec.target = Some(target);
        self
    }

    pub fn spec(&self) -> &RequestSpec<'a> {
        &self.spec
    }

    /// Run the interceptor pipeline, send the request and decode the reply.
    ///
    /// Fails with [`ApiError::InvalidVerb`] before any I/O when the verb is
    /// unsupported.
    pub fn execute(self) -> Result<HttpResponse, ApiError> {
        let method: HttpMethod = self.spec.verb.parse()?;
        self.client.send_request(method, self.spec)
    }
}

impl fmt::Debug for RequestBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutators_accumulate_without_validation() {
        let client = Client::new("http://localhost:3000");
        let builder = client
            .request("BREW", "/pot")
            .with_header("X-A", "1")
            .with_header("x-a", "2")
            .with_url_param("id", "1")
            .with_url_param("id", "2")
            .with_form_param("name", "a b")
            .with_cookie(Cookie::new("session", "abc"))
            .with_basic_auth("user", "pass")
            .with_body("raw");

        let spec = builder.spec();
        assert_eq!(spec.verb(), "BREW");
        assert_eq!(spec.endpoint, "/pot");
        assert_eq!(spec.headers, vec![("X-A".to_string(), "2".to_string())]);
        assert_eq!(spec.url_params.get_all("id"), ["1", "2"]);
        assert_eq!(spec.form_params.get("name"), Some("a b"));
        assert_eq!(spec.cookies.len(), 1);
        assert_eq!(spec.basic_auth, Some(BasicAuth::new("user", "pass")));
        assert!(matches!(spec.body, Some(Body::Text(ref t)) if t == "raw"));
        assert!(spec.target.is_none());
    }

    #[test]
    fn later_body_replaces_earlier_one() {
        let client = Client::new("http://localhost:3000");
        let builder = client
            .post("/users")
            .with_body(vec![1u8, 2, 3])
            .with_json(serde_json::json!({"id": 1}));
        assert!(matches!(builder.spec().body, Some(Body::Json(_))));
        assert_eq!(format!("{:?}", builder.spec().body), "Some(Json)");
    }

    #[test]
    fn into_records_target() {
        let client = Client::new("http://localhost:3000");
        let mut out = serde_json::Value::Null;
        let builder = client.get("/users").into(&mut out);
        assert!(builder.spec().target.is_some());
    }

    #[test]
    fn invalid_verb_is_rejected_at_execute() {
        let client = Client::new("http://127.0.0.1:1");
        let err = client.request("OPTIONS", "/users").execute().unwrap_err();
        assert!(matches!(err, ApiError::InvalidVerb(ref v) if v == "OPTIONS"));
    }
}
