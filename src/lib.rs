//! # Webflow Reconcile
//!
//! > **Declarative reconciliation of Webflow resources.**
//!
//! This crate takes a declared state for a remote Webflow resource and converges the remote
//! side to it: Create, Read, Update, Delete and Diff, safely under rate limiting, transient
//! failures and cancellation. It manages a fixed set of kinds (sites, URL redirects and
//! robots.txt files) that all share one reconciliation pattern.
//!
//! ## Core Concepts
//!
//! ### Generics: `Reconciler<K>`
//! You'll see `Reconciler<K: ResourceKind>` everywhere. The control flow (validate, dry run,
//! diff short-circuit, replace, treat missing as absent) is written **once**; each kind only
//! supplies its handle grammar, validation rules, diff classification and API calls.
//!
//! ### Handles
//! A [`ResourceHandle`](framework::ResourceHandle) is the only thing persisted between runs.
//! Its grammar is fixed per kind; see [`framework::codec`].
//!
//! ### Mocking
//! Reconcilers talk to the network through the [`Transport`](framework::Transport) trait. See
//! the [`framework::mock`] module for an expectation-driven transport.
//!
//! ## Architecture Notes
//!
//! ### 1. Typed Errors
//! Every failure is a [`ReconcileError`](framework::ReconcileError) variant that names the
//! resource, what was expected and how to fix it. Validation failures list every bad field.
//!
//! ### 2. Retry
//! Each request runs under a [`RetryExecutor`](framework::RetryExecutor): bounded exponential
//! backoff, `Retry-After` on 429, and cancellation at both the request and the sleep.
//!
//! ### 3. Concurrency Model
//! Reconcilers are stateless and share one connection pool, so independent resources can be
//! reconciled in parallel tasks without locks.
//!
//! ### 4. Observability
//! `tracing` with structured fields everywhere; each operation runs in a span carrying the
//! resource kind and handle. See the [`lifecycle::tracing`] module.
//!
//! ## Module Tour
//!
//! ### 1. The Engine ([`framework`])
//! Transport, retry, handle codec, validation, diffing and the generic reconciler.
//!
//! ### 2. The Records ([`domain`])
//! Desired and observed records per kind, plus the API's wire shapes.
//!
//! ### 3. The Kinds ([`site`], [`redirect`], [`robots_txt`])
//! Concrete implementations of the [`ResourceKind`](framework::ResourceKind) trait.
//!
//! ### 4. The Wiring ([`lifecycle`])
//! Configuration, the [`ProviderSystem`](lifecycle::ProviderSystem) and tracing setup.
//!
//! ## Quick Start
//!
//! ```bash
//! # Refresh a site and its robots.txt
//! WEBFLOW_API_TOKEN=... RUST_LOG=info cargo run -- 5f0c8c9e1c9d440000e8d8c3 5f0c8c9e1c9d440000e8d8c3/robots.txt
//!
//! # Run the tests
//! cargo test
//! ```

pub mod domain;
pub mod framework;
pub mod lifecycle;
pub mod redirect;
pub mod robots_txt;
pub mod site;
