//! # Resource Kinds
//!
//! [`ResourceKind`] is the contract every managed kind (site, redirect, robots.txt) implements.
//! The generic [`Reconciler`](crate::framework::Reconciler) owns the control flow (validation,
//! dry runs, diff short-circuiting, replacement, not-found handling) and calls these hooks only
//! for the kind-specific parts.
//!
//! # Associated Types
//!
//! - `Id`: the typed remote identity, encoded into a [`ResourceHandle`] by the kind's grammar.
//! - `Desired`: the declared configuration, supplied fresh on every call.
//! - `Observed`: the declared fields plus everything the remote computes.
//!
//! # Provided Methods (Hooks)
//!
//! [`ResourceKind::on_update`] has a default implementation that reports a conflict. Kinds whose
//! remote API has no in-place update classify every change as `Replace` and never reach it.

use crate::framework::client::ApiClient;
use crate::framework::codec::ResourceHandle;
use crate::framework::context::OperationContext;
use crate::framework::diff::DiffSet;
use crate::framework::error::{FieldError, ReconcileError};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Debug;

/// Result of a Create or Update: the (possibly new) handle and the observed state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Applied<O> {
    pub handle: ResourceHandle,
    pub observed: O,
}

/// Result of a Read. `Absent` is the not-found sentinel, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "state", rename_all = "camelCase")]
pub enum Observation<O> {
    Present(O),
    Absent,
}

impl<O> Observation<O> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn into_option(self) -> Option<O> {
        match self {
            Self::Present(observed) => Some(observed),
            Self::Absent => None,
        }
    }
}

/// A remotely managed resource kind.
#[async_trait]
pub trait ResourceKind: Send + Sync + 'static {
    /// Short name used in logs and error messages.
    const NAME: &'static str;

    type Id: Clone + Debug + Send + Sync;
    type Desired: Clone + Debug + Send + Sync;
    type Observed: Clone + Debug + PartialEq + Send + Sync;

    fn encode_id(&self, id: &Self::Id) -> Result<ResourceHandle, ReconcileError>;

    fn decode_id(&self, handle: &ResourceHandle) -> Result<Self::Id, ReconcileError>;

    /// Pure, network-free checks. Returns every failure.
    ///
    /// Dry-run placeholder ids are valid references only while `ctx.dry_run` is set.
    fn validate(&self, ctx: &OperationContext, desired: &Self::Desired) -> Vec<FieldError>;

    /// Compares every mutable field and accumulates all changes.
    fn diff(&self, desired: &Self::Desired, observed: &Self::Observed) -> DiffSet;

    /// Synthesizes the result of applying `desired` without touching the network.
    ///
    /// `prior` is set when previewing an in-place update.
    fn preview(
        &self,
        desired: &Self::Desired,
        prior: Option<&Self::Observed>,
    ) -> Result<Applied<Self::Observed>, ReconcileError>;

    async fn on_create(
        &self,
        api: &ApiClient,
        ctx: &OperationContext,
        desired: &Self::Desired,
    ) -> Result<Applied<Self::Observed>, ReconcileError>;

    /// Fetches current remote truth. `Ok(None)` and `Err(NotFound)` both mean absent.
    async fn on_read(
        &self,
        api: &ApiClient,
        ctx: &OperationContext,
        id: &Self::Id,
    ) -> Result<Option<Self::Observed>, ReconcileError>;

    /// Applies the full mutable payload in place.
    async fn on_update(
        &self,
        _api: &ApiClient,
        _ctx: &OperationContext,
        id: &Self::Id,
        _desired: &Self::Desired,
        _prior: &Self::Observed,
    ) -> Result<Self::Observed, ReconcileError> {
        Err(ReconcileError::Conflict {
            resource: format!("{} {id:?}", Self::NAME),
            detail: "the Webflow API has no in-place update for this resource".into(),
            remedy: "allow replacement so the resource is deleted and recreated".into(),
        })
    }

    async fn on_delete(
        &self,
        api: &ApiClient,
        ctx: &OperationContext,
        id: &Self::Id,
    ) -> Result<(), ReconcileError>;
}
