//! # Transport
//!
//! One authenticated HTTP exchange, with no retry. The [`Transport`] trait is the seam between
//! the engine and the network: production code uses [`HttpTransport`], tests use
//! [`MockTransport`](crate::framework::mock::MockTransport).
//!
//! [`HttpTransport`] owns the only shared resource in the engine, the `reqwest` connection pool.
//! It is cloned into every reconciler and used concurrently without locking.
//!
//! Every request carries:
//!
//! - `Authorization: Bearer <token>` (the token is redacted from all logs)
//! - `Accept-Version: 2.0.0`
//! - `User-Agent: webflow-reconcile/<version>`
//!
//! and is bounded by the configured deadline. TLS 1.2 is the minimum protocol version.

use crate::framework::error::{ReconcileError, TransportError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.webflow.com";
pub const API_VERSION: &str = "2.0.0";
pub const TOKEN_ENV_VAR: &str = "WEBFLOW_API_TOKEN";

const MIN_TOKEN_LEN: usize = 10;

/// A bearer token. `Debug` and `Display` never print the value.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Resolves the token from an explicit secret, falling back to `WEBFLOW_API_TOKEN`.
    pub fn resolve(secret: Option<&str>) -> Result<Self, ReconcileError> {
        Self::resolve_from(secret, std::env::var(TOKEN_ENV_VAR).ok())
    }

    /// Like [`Credential::resolve`] with the environment value supplied by the caller.
    pub fn resolve_from(secret: Option<&str>, env: Option<String>) -> Result<Self, ReconcileError> {
        let token = match (secret, env) {
            (Some(secret), _) => secret.to_string(),
            (None, Some(env)) => env,
            (None, None) => {
                return Err(ReconcileError::Config {
                    code: "WEBFLOW_AUTH_001",
                    detail: "Webflow API token is not configured".into(),
                    remedy: format!(
                        "set the api_token secret in the provider configuration or export {TOKEN_ENV_VAR}"
                    ),
                })
            }
        };
        Self::new(token)
    }

    pub fn new(token: impl Into<String>) -> Result<Self, ReconcileError> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(ReconcileError::Config {
                code: "WEBFLOW_AUTH_002",
                detail: "API token cannot be empty".into(),
                remedy: "provide a valid Webflow API token via configuration or environment variable".into(),
            });
        }
        if token.len() < MIN_TOKEN_LEN {
            return Err(ReconcileError::Config {
                code: "WEBFLOW_AUTH_003",
                detail: "API token appears invalid (too short)".into(),
                remedy: "copy the full token from Site Settings > Apps & Integrations; Webflow tokens are usually 40+ characters".into(),
            });
        }
        Ok(Self(token))
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// A request relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serializes `body` as the JSON payload.
    pub fn with_json<T: Serialize>(self, body: &T) -> Result<Self, ReconcileError> {
        let value = serde_json::to_value(body).map_err(|e| ReconcileError::Decode {
            resource: self.path.clone(),
            detail: format!("cannot encode request body: {e}"),
        })?;
        Ok(self.with_body(value))
    }
}

/// Status, headers and raw body of one exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Issues one HTTP exchange. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn issue(&self, request: ApiRequest) -> Result<HttpResponse, TransportError>;
}

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Refuse plain-HTTP base URLs.
    pub https_only: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            https_only: true,
        }
    }
}

/// `reqwest`-backed [`Transport`].
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    credential: Credential,
}

impl HttpTransport {
    pub fn new(config: TransportConfig, credential: Credential) -> Result<Self, ReconcileError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if config.https_only && !base_url.starts_with("https://") {
            return Err(ReconcileError::Config {
                code: "WEBFLOW_CONFIG_001",
                detail: format!("base URL '{base_url}' does not use HTTPS"),
                remedy: "use an https:// base URL; plain HTTP is only allowed when https_only is disabled for local testing".into(),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert("accept-version", HeaderValue::from_static(API_VERSION));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .https_only(config.https_only)
            .timeout(config.timeout)
            .user_agent(concat!("webflow-reconcile/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| ReconcileError::Config {
                code: "WEBFLOW_CONFIG_002",
                detail: format!("cannot build HTTP client: {e}"),
                remedy: "check the TLS configuration of this host".into(),
            })?;

        Ok(Self {
            client,
            base_url,
            timeout: config.timeout,
            credential,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn classify(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("credential", &self.credential)
            .finish()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn issue(&self, request: ApiRequest) -> Result<HttpResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = %request.method, path = %request.path, "Sending request");

        let mut builder = self
            .client
            .request(request.method, &url)
            .bearer_auth(self.credential.expose());
        if let Some(body) = &request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").json(body);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        debug!(status, bytes = body.len(), "Received response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
