//! # Generic Reconciler
//!
//! This module defines [`Reconciler`], the component that turns a [`ResourceKind`] into the five
//! operations the orchestration layer calls: Create, Read, Update, Delete and Diff.
//!
//! The reconciler is stateless. Everything it needs arrives as parameters, and the only thing it
//! shares with other reconcilers is the [`ApiClient`]'s connection pool, so independent
//! resources can be reconciled in parallel without locks.
//!
//! ## Operations
//!
//! * **Create**:
//!     1. Validates the desired state; failures return before any request.
//!     2. In a dry run, returns the kind's synthesized preview.
//!     3. Calls the `on_create` hook, which mints the handle from the remote response.
//!
//! * **Read**:
//!     1. Decodes the handle; a malformed handle is terminal.
//!     2. Calls `on_read`. A missing resource yields [`Observation::Absent`].
//!
//! * **Update**:
//!     1. Validates, then diffs against the prior observed state. Outside a dry run, ids and
//!        handles minted by a dry run are rejected.
//!     2. An empty diff returns the prior state with zero requests.
//!     3. A diff that requires replacement deletes and recreates (or fails with `Conflict`
//!        under [`ReplacePolicy::Forbid`]).
//!     4. Otherwise calls `on_update` with the full mutable payload.
//!
//! * **Delete**: calls `on_delete`; a missing resource counts as deleted.
//!
//! * **Diff**: pure comparison, delegated to the kind.

use crate::framework::client::ApiClient;
use crate::framework::codec::ResourceHandle;
use crate::framework::context::{OperationContext, ReplacePolicy};
use crate::framework::diff::DiffSet;
use crate::framework::entity::{Applied, Observation, ResourceKind};
use crate::domain::PREVIEW_PREFIX;
use crate::framework::error::{FieldError, ReconcileError};
use crate::framework::validation::ensure_valid;
use tracing::{debug, info, warn};

/// Create/Read/Update/Delete/Diff for one resource kind.
pub struct Reconciler<K: ResourceKind> {
    kind: K,
    api: ApiClient,
}

impl<K: ResourceKind> Clone for Reconciler<K>
where
    K: Clone,
{
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            api: self.api.clone(),
        }
    }
}

impl<K: ResourceKind> Reconciler<K> {
    pub fn new(kind: K, api: ApiClient) -> Self {
        Self { kind, api }
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    /// Runs the kind's pre-flight checks.
    pub fn validate(
        &self,
        ctx: &OperationContext,
        desired: &K::Desired,
    ) -> Result<(), ReconcileError> {
        ensure_valid(K::NAME, self.kind.validate(ctx, desired))
    }

    /// A handle minted by a dry run names nothing remote, so only another dry run may use it.
    fn check_handle(
        &self,
        ctx: &OperationContext,
        handle: &ResourceHandle,
    ) -> Result<(), ReconcileError> {
        let placeholder = handle
            .as_str()
            .split('/')
            .any(|segment| segment.starts_with(PREVIEW_PREFIX));
        if ctx.dry_run || !placeholder {
            return Ok(());
        }
        ensure_valid(
            K::NAME,
            vec![FieldError::new(
                "handle",
                handle.as_str(),
                "a handle returned by an applied create",
                "this handle comes from a dry run; create the resource for real first",
            )],
        )
    }

    pub fn diff(&self, desired: &K::Desired, prior: &K::Observed) -> DiffSet {
        self.kind.diff(desired, prior)
    }

    #[tracing::instrument(skip_all, fields(kind = K::NAME, dry_run = ctx.dry_run))]
    pub async fn create(
        &self,
        ctx: &OperationContext,
        desired: &K::Desired,
    ) -> Result<Applied<K::Observed>, ReconcileError> {
        debug!(?desired, "Create");
        self.validate(ctx, desired)?;

        if ctx.dry_run {
            let preview = self.kind.preview(desired, None)?;
            info!(handle = %preview.handle, "Create previewed");
            return Ok(preview);
        }

        match self.kind.on_create(&self.api, ctx, desired).await {
            Ok(applied) => {
                info!(handle = %applied.handle, "Created");
                Ok(applied)
            }
            Err(e) => {
                warn!(error = %e, "Create failed");
                Err(e)
            }
        }
    }

    #[tracing::instrument(skip_all, fields(kind = K::NAME, %handle))]
    pub async fn read(
        &self,
        ctx: &OperationContext,
        handle: &ResourceHandle,
    ) -> Result<Observation<K::Observed>, ReconcileError> {
        let id = self.kind.decode_id(handle)?;
        match self.kind.on_read(&self.api, ctx, &id).await {
            Ok(Some(observed)) => {
                debug!(found = true, "Read");
                Ok(Observation::Present(observed))
            }
            Ok(None) => {
                info!("Remote resource is gone");
                Ok(Observation::Absent)
            }
            Err(e) if e.is_not_found() => {
                info!("Remote resource is gone");
                Ok(Observation::Absent)
            }
            Err(e) => {
                warn!(error = %e, "Read failed");
                Err(e)
            }
        }
    }

    #[tracing::instrument(skip_all, fields(kind = K::NAME, %handle, dry_run = ctx.dry_run))]
    pub async fn update(
        &self,
        ctx: &OperationContext,
        handle: &ResourceHandle,
        desired: &K::Desired,
        prior: &K::Observed,
    ) -> Result<Applied<K::Observed>, ReconcileError> {
        debug!(?desired, "Update");
        self.validate(ctx, desired)?;
        self.check_handle(ctx, handle)?;
        let id = self.kind.decode_id(handle)?;

        let diff = self.kind.diff(desired, prior);
        if diff.is_empty() {
            debug!("No changes");
            return Ok(Applied {
                handle: handle.clone(),
                observed: prior.clone(),
            });
        }
        debug!(changed = ?diff.fields(), requires_replace = diff.requires_replace(), "Diff");

        if diff.requires_replace() {
            return self.replace(ctx, handle, &id, desired, &diff).await;
        }

        if ctx.dry_run {
            let preview = self.kind.preview(desired, Some(prior))?;
            return Ok(Applied {
                handle: handle.clone(),
                observed: preview.observed,
            });
        }

        match self.kind.on_update(&self.api, ctx, &id, desired, prior).await {
            Ok(observed) => {
                info!("Updated");
                Ok(Applied {
                    handle: handle.clone(),
                    observed,
                })
            }
            Err(e) => {
                warn!(error = %e, "Update failed");
                Err(e)
            }
        }
    }

    async fn replace(
        &self,
        ctx: &OperationContext,
        handle: &ResourceHandle,
        id: &K::Id,
        desired: &K::Desired,
        diff: &DiffSet,
    ) -> Result<Applied<K::Observed>, ReconcileError> {
        if ctx.replace_policy == ReplacePolicy::Forbid {
            return Err(ReconcileError::Conflict {
                resource: format!("{} '{handle}'", K::NAME),
                detail: format!(
                    "fields {:?} cannot be changed in place",
                    diff.fields()
                ),
                remedy: "revert those fields, or allow replacement so the resource is deleted and recreated".into(),
            });
        }

        if ctx.dry_run {
            return self.kind.preview(desired, None);
        }

        info!(changed = ?diff.fields(), "Replacing");
        self.delete_id(ctx, id).await?;
        let applied = self.kind.on_create(&self.api, ctx, desired).await?;
        info!(new_handle = %applied.handle, "Replaced");
        Ok(applied)
    }

    #[tracing::instrument(skip_all, fields(kind = K::NAME, %handle))]
    pub async fn delete(
        &self,
        ctx: &OperationContext,
        handle: &ResourceHandle,
    ) -> Result<(), ReconcileError> {
        let id = self.kind.decode_id(handle)?;
        self.delete_id(ctx, &id).await?;
        info!("Deleted");
        Ok(())
    }

    async fn delete_id(&self, ctx: &OperationContext, id: &K::Id) -> Result<(), ReconcileError> {
        match self.kind.on_delete(&self.api, ctx, id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!("Already absent");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Delete failed");
                Err(e)
            }
        }
    }
}
