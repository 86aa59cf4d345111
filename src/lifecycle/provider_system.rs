use crate::framework::{
    ApiClient, Applied, Credential, DiffSet, HttpTransport, Observation, OperationContext,
    ReconcileError, Reconciler, ResourceHandle, RetryExecutor, RetryPolicy, Transport,
};
use crate::lifecycle::config::ProviderConfig;
use crate::lifecycle::resource::{kind_of_handle, DesiredResource, ObservedResource, ResourceKindTag};
use crate::redirect::Redirect;
use crate::robots_txt::RobotsTxt;
use crate::site::Site;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Wires one shared transport into the reconciler of every managed kind.
///
/// `ProviderSystem` is responsible for:
/// - **Credential resolution**: explicit secret first, then `WEBFLOW_API_TOKEN`
/// - **Dependency wiring**: one [`HttpTransport`] (and so one connection pool) behind every
///   reconciler
/// - **Cancellation**: a root token whose children are handed to each operation
///
/// # Example
///
/// ```ignore
/// let system = ProviderSystem::new(ProviderConfig::from_env()?)?;
/// let ctx = system.context();
///
/// let applied = system.robots_txt.create(&ctx, &desired).await?;
/// let current = system.read_any(&ctx, &applied.handle).await?;
///
/// system.shutdown();
/// ```
pub struct ProviderSystem {
    pub sites: Reconciler<Site>,
    pub redirects: Reconciler<Redirect>,
    pub robots_txt: Reconciler<RobotsTxt>,

    cancel: CancellationToken,
}

fn kind_mismatch(handle: &ResourceHandle, expected: ResourceKindTag, got: ResourceKindTag) -> ReconcileError {
    ReconcileError::Conflict {
        resource: format!("{expected} '{handle}'"),
        detail: format!("the supplied state describes a {got}"),
        remedy: "pass the desired and prior state of the same resource kind as the handle".into(),
    }
}

fn unknown_handle(handle: &ResourceHandle) -> ReconcileError {
    ReconcileError::MalformedHandle {
        resource: "resource",
        handle: handle.to_string(),
        expected: "'{siteId}', '{siteId}/redirects/{redirectId}' or '{siteId}/robots.txt'".into(),
    }
}

impl ProviderSystem {
    /// Resolves the credential and builds the HTTP transport from `config`.
    pub fn new(config: ProviderConfig) -> Result<Self, ReconcileError> {
        let credential = Credential::resolve(config.api_token.as_deref())?;
        let transport = HttpTransport::new(config.transport_config(), credential)?;
        info!(base_url = transport.base_url(), "Provider configured");
        Ok(Self::with_transport(
            Arc::new(transport),
            config.retry_policy(),
        ))
    }

    /// Builds the system over any [`Transport`], e.g. a mock.
    pub fn with_transport(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        let api = ApiClient::new(transport, RetryExecutor::new(policy));
        Self {
            sites: crate::site::new(api.clone()),
            redirects: crate::redirect::new(api.clone()),
            robots_txt: crate::robots_txt::new(api),
            cancel: CancellationToken::new(),
        }
    }

    /// A fresh context whose cancellation follows [`ProviderSystem::shutdown`].
    pub fn context(&self) -> OperationContext {
        OperationContext::new(self.cancel.child_token())
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancels every in-flight request and backoff sleep.
    pub fn shutdown(&self) {
        info!("Cancelling in-flight operations");
        self.cancel.cancel();
    }

    pub async fn create_any(
        &self,
        ctx: &OperationContext,
        desired: &DesiredResource,
    ) -> Result<Applied<ObservedResource>, ReconcileError> {
        Ok(match desired {
            DesiredResource::Site(d) => {
                let a = self.sites.create(ctx, d).await?;
                Applied { handle: a.handle, observed: ObservedResource::Site(a.observed) }
            }
            DesiredResource::Redirect(d) => {
                let a = self.redirects.create(ctx, d).await?;
                Applied { handle: a.handle, observed: ObservedResource::Redirect(a.observed) }
            }
            DesiredResource::RobotsTxt(d) => {
                let a = self.robots_txt.create(ctx, d).await?;
                Applied { handle: a.handle, observed: ObservedResource::RobotsTxt(a.observed) }
            }
        })
    }

    /// Reads any handle, dispatching on its grammar.
    pub async fn read_any(
        &self,
        ctx: &OperationContext,
        handle: &ResourceHandle,
    ) -> Result<Observation<ObservedResource>, ReconcileError> {
        let kind = kind_of_handle(handle).ok_or_else(|| unknown_handle(handle))?;
        Ok(match kind {
            ResourceKindTag::Site => match self.sites.read(ctx, handle).await? {
                Observation::Present(o) => Observation::Present(ObservedResource::Site(o)),
                Observation::Absent => Observation::Absent,
            },
            ResourceKindTag::Redirect => match self.redirects.read(ctx, handle).await? {
                Observation::Present(o) => Observation::Present(ObservedResource::Redirect(o)),
                Observation::Absent => Observation::Absent,
            },
            ResourceKindTag::RobotsTxt => match self.robots_txt.read(ctx, handle).await? {
                Observation::Present(o) => Observation::Present(ObservedResource::RobotsTxt(o)),
                Observation::Absent => Observation::Absent,
            },
        })
    }

    pub async fn update_any(
        &self,
        ctx: &OperationContext,
        handle: &ResourceHandle,
        desired: &DesiredResource,
        prior: &ObservedResource,
    ) -> Result<Applied<ObservedResource>, ReconcileError> {
        Ok(match (desired, prior) {
            (DesiredResource::Site(d), ObservedResource::Site(p)) => {
                let a = self.sites.update(ctx, handle, d, p).await?;
                Applied { handle: a.handle, observed: ObservedResource::Site(a.observed) }
            }
            (DesiredResource::Redirect(d), ObservedResource::Redirect(p)) => {
                let a = self.redirects.update(ctx, handle, d, p).await?;
                Applied { handle: a.handle, observed: ObservedResource::Redirect(a.observed) }
            }
            (DesiredResource::RobotsTxt(d), ObservedResource::RobotsTxt(p)) => {
                let a = self.robots_txt.update(ctx, handle, d, p).await?;
                Applied { handle: a.handle, observed: ObservedResource::RobotsTxt(a.observed) }
            }
            _ => return Err(kind_mismatch(handle, prior.kind(), desired.kind())),
        })
    }

    pub async fn delete_any(
        &self,
        ctx: &OperationContext,
        handle: &ResourceHandle,
    ) -> Result<(), ReconcileError> {
        match kind_of_handle(handle).ok_or_else(|| unknown_handle(handle))? {
            ResourceKindTag::Site => self.sites.delete(ctx, handle).await,
            ResourceKindTag::Redirect => self.redirects.delete(ctx, handle).await,
            ResourceKindTag::RobotsTxt => self.robots_txt.delete(ctx, handle).await,
        }
    }

    pub fn diff_any(
        &self,
        handle: &ResourceHandle,
        desired: &DesiredResource,
        prior: &ObservedResource,
    ) -> Result<DiffSet, ReconcileError> {
        match (desired, prior) {
            (DesiredResource::Site(d), ObservedResource::Site(p)) => Ok(self.sites.diff(d, p)),
            (DesiredResource::Redirect(d), ObservedResource::Redirect(p)) => {
                Ok(self.redirects.diff(d, p))
            }
            (DesiredResource::RobotsTxt(d), ObservedResource::RobotsTxt(p)) => {
                Ok(self.robots_txt.diff(d, p))
            }
            _ => Err(kind_mismatch(handle, prior.kind(), desired.kind())),
        }
    }
}
