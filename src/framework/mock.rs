//! # Mock Transport & Testing Guide
//!
//! `MockTransport` implements the same [`Transport`] trait as [`HttpTransport`] but answers from
//! an in-memory queue of expectations. It lets you drive a reconciler through rate limits,
//! network failures and missing resources deterministically, and then assert on exactly which
//! requests were sent.
//!
//! ## When to use Mocks vs a Real Server
//!
//! | Feature | MockTransport | wiremock + HttpTransport |
//! |---------|---------------|--------------------------|
//! | **Speed** | Instant (in-memory) | Fast (loopback HTTP) |
//! | **Time control** | Works with `start_paused` | Real clock |
//! | **Headers/TLS** | Not exercised | Exercised |
//! | **Use Case** | Reconciler logic, retry timing | Wire format, auth headers |
//!
//! ## Example
//!
//! ```rust
//! use reqwest::Method;
//! use serde_json::json;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use webflow_reconcile::framework::mock::MockTransport;
//! use webflow_reconcile::framework::{ApiClient, ApiRequest, RetryExecutor};
//!
//! #[tokio::main]
//! async fn main() {
//!     // 1. Setup expectations
//!     let mock = MockTransport::new();
//!     mock.expect(Method::GET, "/v2/sites/abc")
//!         .rate_limited(Some(1));
//!     mock.expect(Method::GET, "/v2/sites/abc")
//!         .respond_json(200, json!({"id": "abc"}));
//!
//!     // 2. Drive the code under test
//!     let api = ApiClient::new(Arc::new(mock.clone()), RetryExecutor::default());
//!     let response = api
//!         .send("site 'abc'", &CancellationToken::new(), ApiRequest::get("/v2/sites/abc"))
//!         .await
//!         .unwrap();
//!     assert_eq!(response.status, 200);
//!
//!     // 3. Verify
//!     mock.verify();
//!     assert_eq!(mock.call_count(), 2);
//! }
//! ```
//!
//! Requests that arrive with no matching expectation panic with the method and path, which
//! fails the calling test.
//!
//! [`HttpTransport`]: crate::framework::HttpTransport

use crate::framework::error::TransportError;
use crate::framework::transport::{ApiRequest, HttpResponse, Transport};
use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::Method;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

enum Reply {
    Respond(HttpResponse),
    /// Answers with the request body as the response body.
    Echo { status: u16 },
    Fail(TransportError),
}

struct Expectation {
    method: Method,
    path: String,
    reply: Reply,
}

/// A transport that answers from a queue of expectations, in order.
#[derive(Clone, Default)]
pub struct MockTransport {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    calls: Arc<Mutex<Vec<ApiRequest>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    /// Creates a mock with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects the next request to be `method path`.
    pub fn expect(&self, method: Method, path: impl Into<String>) -> ExpectationBuilder {
        ExpectationBuilder {
            method,
            path: path.into(),
            expectations: self.expectations.clone(),
        }
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<ApiRequest> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// `METHOD path` for every request received so far.
    pub fn call_log(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .map(|c| format!("{} {}", c.method, c.path))
            .collect()
    }

    /// Panics unless every expectation was consumed.
    pub fn verify(&self) {
        let remaining = lock(&self.expectations);
        if !remaining.is_empty() {
            let pending: Vec<String> = remaining
                .iter()
                .map(|e| format!("{} {}", e.method, e.path))
                .collect();
            panic!(
                "Not all expectations were met. {} remaining: {:?}",
                remaining.len(),
                pending
            );
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn issue(&self, request: ApiRequest) -> Result<HttpResponse, TransportError> {
        lock(&self.calls).push(request.clone());

        let expectation = lock(&self.expectations).pop_front();
        let Some(expectation) = expectation else {
            panic!("Unexpected request {} {}", request.method, request.path);
        };
        if expectation.method != request.method || expectation.path != request.path {
            panic!(
                "Expectation mismatch: expected {} {}, got {} {}",
                expectation.method, expectation.path, request.method, request.path
            );
        }

        match expectation.reply {
            Reply::Respond(response) => Ok(response),
            Reply::Echo { status } => {
                let body = request.body.map(|b| b.to_string()).unwrap_or_default();
                Ok(HttpResponse::new(status, body))
            }
            Reply::Fail(error) => Err(error),
        }
    }
}

/// Builder for one expected request.
pub struct ExpectationBuilder {
    method: Method,
    path: String,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

impl ExpectationBuilder {
    fn push(self, reply: Reply) {
        lock(&self.expectations).push_back(Expectation {
            method: self.method,
            path: self.path,
            reply,
        });
    }

    /// Responds with a raw body.
    pub fn respond(self, status: u16, body: impl Into<String>) {
        self.push(Reply::Respond(HttpResponse::new(status, body)));
    }

    /// Responds with a JSON body.
    pub fn respond_json(self, status: u16, body: Value) {
        self.respond(status, body.to_string());
    }

    /// Responds with the request's own JSON body.
    pub fn echo(self, status: u16) {
        self.push(Reply::Echo { status });
    }

    /// Responds 429, with a `Retry-After` header when `retry_after_secs` is set.
    pub fn rate_limited(self, retry_after_secs: Option<u64>) {
        let mut response = HttpResponse::new(429, r#"{"message":"Too many requests"}"#);
        if let Some(secs) = retry_after_secs {
            response
                .headers
                .insert("retry-after", HeaderValue::from(secs));
        }
        self.push(Reply::Respond(response));
    }

    /// Responds 404 with a Webflow-style error body.
    pub fn not_found(self) {
        self.respond_json(
            404,
            serde_json::json!({"code": "resource_not_found", "message": "Requested resource not found"}),
        );
    }

    /// Fails with a connection error instead of responding.
    pub fn network_error(self, message: &str) {
        self.push(Reply::Fail(TransportError::Connect(message.to_string())));
    }
}
