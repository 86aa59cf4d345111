//! # Reconciliation Errors
//!
//! This module defines the error taxonomy shared by every layer of the engine. By centralizing
//! error definitions, each resource kind reports failures the same way and the retry layer can
//! classify them without knowing which kind issued the request.
//!
//! Every message names the offending field or resource, states the expected format or remote
//! constraint, and ends with a concrete remedy.

use crate::framework::codec::ResourceHandle;
use std::fmt;
use std::time::Duration;

/// One failed pre-flight check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub value: String,
    pub expected: String,
    pub remedy: String,
}

impl FieldError {
    pub fn new(
        field: &'static str,
        value: impl Into<String>,
        expected: impl Into<String>,
        remedy: impl Into<String>,
    ) -> Self {
        Self {
            field,
            value: value.into(),
            expected: expected.into(),
            remedy: remedy.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: got '{}', expected {}. Fix: {}",
            self.field, self.value, self.expected, self.remedy
        )
    }
}

/// Joins field errors into one line per error for display.
struct FieldErrors<'a>(&'a [FieldError]);

impl fmt::Display for FieldErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

/// Network-level failure reported by a [`Transport`](crate::framework::Transport).
///
/// No HTTP status was received. All variants are retryable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}: the Webflow API did not answer in time. Check your network connection and try again")]
    Timeout(Duration),

    #[error("cannot connect to the Webflow API: {0}. Check your network connection, proxy and firewall settings")]
    Connect(String),

    #[error("network error talking to the Webflow API: {0}. Retry the operation; if it persists check the API status page")]
    Other(String),
}

/// Errors surfaced by reconciler operations.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Pre-flight validation failed; no request was sent.
    #[error("invalid {resource} configuration: {}", FieldErrors(.errors))]
    Validation {
        resource: &'static str,
        errors: Vec<FieldError>,
    },

    /// The remote resource does not exist.
    #[error("{resource} not found: {detail}. Verify the identifier is correct and that the resource still exists in the Webflow dashboard")]
    NotFound {
        resource: String,
        detail: String,
    },

    /// 401 or 403.
    #[error("access denied to {resource} (HTTP {status}): {detail}. Verify the API token is valid, carries the scopes this resource needs, and belongs to the workspace that owns the site")]
    PermissionDenied {
        resource: String,
        status: u16,
        detail: String,
    },

    /// 429. Absorbed by the retry executor until the attempt budget runs out.
    #[error("rate limited while accessing {resource}: too many requests. Wait a few minutes before retrying or reduce the number of parallel operations")]
    RateLimited {
        resource: String,
        retry_after: Option<Duration>,
    },

    /// An immutable field changed and replacement was not permitted, or the remote reported a
    /// conflicting state.
    #[error("conflict on {resource}: {detail}. Fix: {remedy}")]
    Conflict {
        resource: String,
        detail: String,
        remedy: String,
    },

    #[error("transport failure while accessing {resource}: {source}")]
    Transport {
        resource: String,
        #[source]
        source: TransportError,
    },

    /// 5xx. Retryable.
    #[error("Webflow API server error for {resource} (HTTP {status}): {detail}. This is a temporary issue on the remote side; wait a few minutes and try again")]
    Server {
        resource: String,
        status: u16,
        detail: String,
    },

    /// Any other 4xx: the remote refused the payload.
    #[error("Webflow API rejected the request for {resource} (HTTP {status}): {detail}. Check the resource configuration against the field formats and retry")]
    RemoteRejected {
        resource: String,
        status: u16,
        detail: String,
    },

    /// Retryable failures persisted past the attempt budget.
    #[error("giving up on {resource} after {attempts} attempts (last status {}, waited {waited:?}): {source}", .last_status.map_or_else(|| "none".to_string(), |s| s.to_string()))]
    MaxRetriesExceeded {
        resource: String,
        attempts: u32,
        last_status: Option<u16>,
        waited: Duration,
        #[source]
        source: Box<ReconcileError>,
    },

    /// The caller cancelled the operation.
    #[error("operation on {resource} was cancelled during {during}. Re-run the operation to continue")]
    Cancelled {
        resource: String,
        during: &'static str,
    },

    /// The resource exists remotely under `handle`, but a follow-up step of its creation did not
    /// finish. Callers must record the handle or the resource is orphaned.
    #[error("{resource} was created as '{handle}' but {step} did not finish: {source}. Fix: record the handle; the next update completes {step}")]
    PartiallyApplied {
        resource: String,
        handle: ResourceHandle,
        step: &'static str,
        #[source]
        source: Box<ReconcileError>,
    },

    #[error("malformed {resource} handle '{handle}': expected {expected}. Fix: use the identifier produced when the resource was created, or import with the correct format")]
    MalformedHandle {
        resource: &'static str,
        handle: String,
        expected: String,
    },

    /// A success response body could not be decoded.
    #[error("unexpected response for {resource}: {detail}. The Webflow API may have changed; retry, and report the issue if it persists")]
    Decode {
        resource: String,
        detail: String,
    },

    /// Missing or unusable configuration, such as the API token.
    #[error("[{code}] {detail}. Fix: {remedy}")]
    Config {
        code: &'static str,
        detail: String,
        remedy: String,
    },
}

impl ReconcileError {
    /// Maps a non-success HTTP status to its typed error.
    pub fn from_status(
        resource: &str,
        status: u16,
        retry_after: Option<Duration>,
        body: &str,
    ) -> Self {
        let resource = resource.to_string();
        let detail = remote_message(body);
        match status {
            401 | 403 => Self::PermissionDenied {
                resource,
                status,
                detail,
            },
            404 => Self::NotFound { resource, detail },
            409 => Self::Conflict {
                resource,
                detail,
                remedy: "refresh state and retry; another change may have been applied concurrently"
                    .into(),
            },
            429 => Self::RateLimited {
                resource,
                retry_after,
            },
            500..=599 => Self::Server {
                resource,
                status,
                detail,
            },
            _ => Self::RemoteRejected {
                resource,
                status,
                detail,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for a cancellation, including one that interrupted a creation after the resource
    /// already existed.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::PartiallyApplied { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Handle of a resource that exists despite the error.
    pub fn applied_handle(&self) -> Option<&ResourceHandle> {
        match self {
            Self::PartiallyApplied { handle, .. } => Some(handle),
            _ => None,
        }
    }

    /// Whether the retry executor may try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Server { .. } | Self::Transport { .. }
        )
    }

    /// Server-provided wait hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status that produced this error, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::RateLimited { .. } => Some(429),
            Self::PermissionDenied { status, .. }
            | Self::Server { status, .. }
            | Self::RemoteRejected { status, .. } => Some(*status),
            Self::MaxRetriesExceeded { last_status, .. } => *last_status,
            _ => None,
        }
    }
}

/// Pulls the human-readable message out of a Webflow error body.
///
/// Error bodies look like `{"code":"...","message":"..."}`; anything else is passed through
/// truncated.
fn remote_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(|m| m.as_str());
    match message {
        Some(message) => message.to_string(),
        None if body.trim().is_empty() => "no details returned".to_string(),
        None => crate::lifecycle::truncate_for_log(body.trim(), 200),
    }
}
