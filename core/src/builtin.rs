//! Ready-made interceptors.

use tracing::debug;

use crate::http::{HttpRequest, HttpResponse};
use crate::interceptor::{HookResult, Interceptor};
use crate::request::RequestSpec;

/// Sets the `Authorization` header on every request.
#[derive(Debug, Clone)]
pub struct Authorization {
    value: String,
}

impl Authorization {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }

    pub fn bearer(token: &str) -> Self {
        Self::new(format!("Bearer {token}"))
    }
}

impl Interceptor for Authorization {
    fn on_request(&self, spec: &mut RequestSpec<'_>) -> HookResult {
        spec.set_header("Authorization", self.value.as_str());
        Ok(())
    }
}

/// Logs every raw request and response at debug level.
#[derive(Debug, Clone, Default)]
pub struct DebugLog {
    log_body: bool,
}

impl DebugLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log request and response bodies, lossily decoded as UTF-8.
    pub fn with_body(mut self) -> Self {
        self.log_body = true;
        self
    }
}

impl Interceptor for DebugLog {
    fn on_raw_request(&self, request: &mut HttpRequest) -> HookResult {
        debug!(
            method = %request.method,
            url = %request.url,
            headers = ?request.headers,
            "HTTP request"
        );
        if self.log_body {
            if let Some(body) = &request.body {
                debug!(body = %String::from_utf8_lossy(body), "HTTP request body");
            }
        }
        Ok(())
    }

    fn on_raw_response(&self, response: &mut HttpResponse) -> HookResult {
        debug!(
            status = response.status,
            status_text = %response.status_text,
            headers = ?response.headers,
            "HTTP response"
        );
        if self.log_body {
            debug!(body = %response.text(), "HTTP response body");
        }
        Ok(())
    }
}
