//! Wiring, configuration and observability.
//!
//! This module turns a [`ProviderConfig`] into a running [`ProviderSystem`]:
//!
//! - **Configuration**: defaults, deserialization and `WEBFLOW_*` environment overrides
//! - **Wiring**: one shared transport behind the reconciler of every kind
//! - **Dispatch**: kind-tagged records for callers that only hold a handle
//! - **Observability**: tracing setup and log-safe truncation
//!
//! # Main Components
//!
//! - [`ProviderSystem`] - Owns the reconcilers and the root cancellation token
//! - [`ProviderConfig`] - Provider settings
//! - [`DesiredResource`] / [`ObservedResource`] - Records of any managed kind
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure

pub mod config;
pub mod provider_system;
pub mod resource;
pub mod tracing;

pub use config::*;
pub use provider_system::*;
pub use resource::*;
pub use self::tracing::*;
