//! # API Client
//!
//! [`ApiClient`] composes a shared [`Transport`] with a [`RetryExecutor`]. Resource kinds never
//! touch the transport directly: every request they send goes through [`ApiClient::send`], so
//! rate limiting, backoff and cancellation behave the same for all kinds.

use crate::framework::error::ReconcileError;
use crate::framework::retry::RetryExecutor;
use crate::framework::transport::{ApiRequest, HttpResponse, Transport};
use crate::lifecycle::truncate_for_log;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Retrying, cancellable access to the remote API.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    executor: RetryExecutor,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, executor: RetryExecutor) -> Self {
        Self {
            transport,
            executor,
        }
    }

    /// Sends `request` under the retry policy. Only 2xx responses are returned.
    pub async fn send(
        &self,
        resource: &str,
        cancel: &CancellationToken,
        request: ApiRequest,
    ) -> Result<HttpResponse, ReconcileError> {
        let outcome = self
            .executor
            .execute(resource, cancel, || self.transport.issue(request.clone()))
            .await?;
        debug!(
            resource,
            attempts = outcome.attempts,
            waited_ms = outcome.waited.as_millis() as u64,
            body = %truncate_for_log(&outcome.response.body, 500),
            "Response"
        );
        Ok(outcome.response)
    }

    /// Like [`ApiClient::send`], decoding the JSON body as `T`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        cancel: &CancellationToken,
        request: ApiRequest,
    ) -> Result<T, ReconcileError> {
        let response = self.send(resource, cancel, request).await?;
        decode_json(resource, &response.body)
    }
}

pub fn decode_json<T: DeserializeOwned>(resource: &str, body: &str) -> Result<T, ReconcileError> {
    serde_json::from_str(body).map_err(|e| ReconcileError::Decode {
        resource: resource.to_string(),
        detail: format!("cannot parse response body ({e}): {}", truncate_for_log(body, 200)),
    })
}
