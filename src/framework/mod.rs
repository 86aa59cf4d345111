//! Generic reconciliation engine for remotely managed resources.
//!
//! This module provides the building blocks shared by every resource kind: the network seam,
//! retry, handle encoding, validation, diffing and the generic reconciler that ties them
//! together.
//!
//! # Main Components
//!
//! - [`Transport`] / [`HttpTransport`] - One authenticated HTTP exchange, no retry
//! - [`RetryExecutor`] - Bounded exponential backoff with rate-limit hints and cancellation
//! - [`HandleGrammar`] - Pure encode/decode of [`ResourceHandle`]s
//! - [`Validator`] - Pre-flight field checks
//! - [`DiffSet`] - Accumulated per-field changes
//! - [`ResourceKind`] - Trait each managed kind implements
//! - [`Reconciler`] - Create/Read/Update/Delete/Diff over a `ResourceKind`
//! - [`ReconcileError`] - The error taxonomy
//!
//! Dependency order: `Transport` ← `RetryExecutor` ← `ApiClient` ← `Reconciler`; the codec and
//! validator are leaves used by the kinds.
//!
//! # Testing
//!
//! See the [`mock`] module for an expectation-driven transport.

pub mod client;
pub mod codec;
pub mod context;
pub mod diff;
pub mod entity;
pub mod error;
pub mod mock;
pub mod reconciler;
pub mod retry;
pub mod transport;
pub mod validation;

// Re-export core types for convenience
pub use client::ApiClient;
pub use codec::{HandleGrammar, ResourceHandle, Segment};
pub use context::{OperationContext, ReplacePolicy};
pub use diff::{ChangeKind, DiffSet, PropertyDiff};
pub use entity::{Applied, Observation, ResourceKind};
pub use error::{FieldError, ReconcileError, TransportError};
pub use reconciler::Reconciler;
pub use retry::{Disposition, RetryDecision, RetryExecutor, RetryOutcome, RetryPolicy};
pub use transport::{ApiRequest, Credential, HttpResponse, HttpTransport, Transport, TransportConfig};
pub use validation::Validator;
