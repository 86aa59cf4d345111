//! Per-call options supplied by the orchestration layer.

use tokio_util::sync::CancellationToken;

/// What Update may do when a changed field cannot be applied in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplacePolicy {
    /// Delete the remote resource, then create it from the desired state.
    #[default]
    DeleteBeforeCreate,
    /// Fail with `Conflict` before any request is sent.
    Forbid,
}

/// Options for one reconciler call.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    /// Preview only: Create and Update return synthesized state and send nothing.
    pub dry_run: bool,
    pub replace_policy: ReplacePolicy,
    /// Aborts in-flight requests and backoff sleeps.
    pub cancel: CancellationToken,
}

impl OperationContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..Self::default()
        }
    }

    pub fn preview() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    pub fn with_replace_policy(mut self, policy: ReplacePolicy) -> Self {
        self.replace_policy = policy;
        self
    }
}
