//! Interceptors: hooks that observe or rewrite requests and responses.
//!
//! # Design
//! The pipeline has three stages. Each stage visits interceptors in
//! registration order:
//!
//! 1. [`Stage::Request`] sees the mutable [`RequestSpec`] before it is turned
//!    into a wire request.
//! 2. [`Stage::RawRequest`] sees the negotiated [`HttpRequest`] just before
//!    the transport is called.
//! 3. [`Stage::RawResponse`] sees the buffered [`HttpResponse`] before the
//!    body is decoded.
//!
//! The first hook error stops the pipeline. Registration is append-only and
//! copy-on-write. A send works from a snapshot taken when it starts, so it
//! sees the whole list from before or after a concurrent registration.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::request::RequestSpec;

/// Error type hooks return. The boxed value is preserved as the source of
/// [`ApiError::InterceptorError`].
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

pub type HookResult = Result<(), HookError>;

/// Pipeline stage at which a hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Request,
    RawRequest,
    RawResponse,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Request => "request",
            Stage::RawRequest => "raw request",
            Stage::RawResponse => "raw response",
        })
    }
}

/// A bundle of up to three hooks. Every method defaults to a no-op.
pub trait Interceptor: Send + Sync {
    fn on_request(&self, _spec: &mut RequestSpec<'_>) -> HookResult {
        Ok(())
    }

    fn on_raw_request(&self, _request: &mut HttpRequest) -> HookResult {
        Ok(())
    }

    fn on_raw_response(&self, _response: &mut HttpResponse) -> HookResult {
        Ok(())
    }
}

type RequestHook = Box<dyn Fn(&mut RequestSpec<'_>) -> HookResult + Send + Sync>;
type RawRequestHook = Box<dyn Fn(&mut HttpRequest) -> HookResult + Send + Sync>;
type RawResponseHook = Box<dyn Fn(&mut HttpResponse) -> HookResult + Send + Sync>;

/// An [`Interceptor`] assembled from closures.
///
/// ```
/// use chainreq::Hooks;
///
/// let hooks = Hooks::new().on_request(|spec| {
///     spec.set_header("X-Trace", "1");
///     Ok(())
/// });
/// # let _ = hooks;
/// ```
#[derive(Default)]
pub struct Hooks {
    request: Option<RequestHook>,
    raw_request: Option<RawRequestHook>,
    raw_response: Option<RawResponseHook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RequestSpec<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.request = Some(Box::new(hook));
        self
    }

    pub fn on_raw_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut HttpRequest) -> HookResult + Send + Sync + 'static,
    {
        self.raw_request = Some(Box::new(hook));
        self
    }

    pub fn on_raw_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut HttpResponse) -> HookResult + Send + Sync + 'static,
    {
        self.raw_response = Some(Box::new(hook));
        self
    }
}

impl Interceptor for Hooks {
    fn on_request(&self, spec: &mut RequestSpec<'_>) -> HookResult {
        match &self.request {
            Some(hook) => hook(spec),
            None => Ok(()),
        }
    }

    fn on_raw_request(&self, request: &mut HttpRequest) -> HookResult {
        match &self.raw_request {
            Some(hook) => hook(request),
            None => Ok(()),
        }
    }

    fn on_raw_response(&self, response: &mut HttpResponse) -> HookResult {
        match &self.raw_response {
            Some(hook) => hook(response),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("request", &self.request.is_some())
            .field("raw_request", &self.raw_request.is_some())
            .field("raw_response", &self.raw_response.is_some())
            .finish()
    }
}

/// Immutable view of the chain taken at the start of a send.
pub type Snapshot = Arc<Vec<Arc<dyn Interceptor>>>;

/// Append-only, order-preserving list of interceptors.
#[derive(Default)]
pub struct InterceptorChain {
    interceptors: RwLock<Snapshot>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, interceptor: Arc<dyn Interceptor>) {
        let mut guard = self.interceptors.write();
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(interceptor);
        *guard = Arc::new(next);
    }

    pub fn snapshot(&self) -> Snapshot {
        self.interceptors.read().clone()
    }

    pub fn len(&self) -> usize {
        self.interceptors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("len", &self.len())
            .finish()
    }
}

fn stage_error(stage: Stage) -> impl FnOnce(HookError) -> ApiError {
    move |source| ApiError::InterceptorError { stage, source }
}

pub(crate) fn run_request(
    chain: &[Arc<dyn Interceptor>],
    spec: &mut RequestSpec<'_>,
) -> Result<(), ApiError> {
    for interceptor in chain {
        interceptor.on_request(spec).map_err(stage_error(Stage::Request))?;
    }
    Ok(())
}

pub(crate) fn run_raw_request(
    chain: &[Arc<dyn Interceptor>],
    request: &mut HttpRequest,
) -> Result<(), ApiError> {
    for interceptor in chain {
        interceptor
            .on_raw_request(request)
            .map_err(stage_error(Stage::RawRequest))?;
    }
    Ok(())
}

pub(crate) fn run_raw_response(
    chain: &[Arc<dyn Interceptor>],
    response: &mut HttpResponse,
) -> Result<(), ApiError> {
    for interceptor in chain {
        interceptor
            .on_raw_response(response)
            .map_err(stage_error(Stage::RawResponse))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::http::HttpMethod;

    fn raw_request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            url: "http://localhost/users".to_string(),
            headers: Vec::new(),
            body: None,
            cookies: Vec::new(),
            basic_auth: None,
        }
    }

    #[test]
    fn snapshot_is_unaffected_by_later_registration() {
        let chain = InterceptorChain::new();
        chain.register(Arc::new(Hooks::new()));
        let before = chain.snapshot();
        chain.register(Arc::new(Hooks::new()));
        assert_eq!(before.len(), 1);
        assert_eq!(chain.snapshot().len(), 2);
    }

    #[test]
    fn raw_request_hooks_run_in_registration_order() {
        let chain = InterceptorChain::new();
        for tag in ["a", "b", "c"] {
            chain.register(Arc::new(Hooks::new().on_raw_request(move |req| {
                let seen = req.header("X-Order").unwrap_or("").to_string();
                req.set_header("X-Order", format!("{seen}{tag}"));
                Ok(())
            })));
        }
        let mut req = raw_request();
        run_raw_request(&chain.snapshot(), &mut req).unwrap();
        assert_eq!(req.header("x-order"), Some("abc"));
    }

    #[test]
    fn first_error_stops_the_stage() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = InterceptorChain::new();
        let counter = Arc::clone(&calls);
        chain.register(Arc::new(Hooks::new().on_raw_request(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("denied".into())
        })));
        let counter = Arc::clone(&calls);
        chain.register(Arc::new(Hooks::new().on_raw_request(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })));

        let err = run_raw_request(&chain.snapshot(), &mut raw_request()).unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        match err {
            ApiError::InterceptorError { stage, source } => {
                assert_eq!(stage, Stage::RawRequest);
                assert_eq!(source.to_string(), "denied");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_hooks_are_no_ops() {
        let chain = InterceptorChain::new();
        chain.register(Arc::new(Hooks::new()));
        let mut resp = HttpResponse {
            status: 200,
            status_text: "OK".to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        };
        run_raw_response(&chain.snapshot(), &mut resp).unwrap();
        run_raw_request(&chain.snapshot(), &mut raw_request()).unwrap();
        assert_eq!(
            format!("{:?}", Hooks::new()),
            "Hooks { request: false, raw_request: false, raw_response: false }"
        );
    }
}
