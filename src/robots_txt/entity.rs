//! [`ResourceKind`] implementation for a site's robots.txt.
//!
//! The file is a singleton per site, so the handle carries only the site id. The API stores
//! structured rules rather than text; the declared text is kept verbatim whenever the remote
//! echoes exactly the structure that was sent.

use super::content::{format_content, parse_content, same_directives};
use crate::domain::{check_site_id, now_rfc3339, RobotsTxtBody, RobotsTxtDesired, RobotsTxtObserved};
use crate::framework::validation::{non_empty, Validator};
use crate::framework::{
    ApiClient, ApiRequest, Applied, ChangeKind, DiffSet, FieldError, HandleGrammar,
    OperationContext, ReconcileError, ResourceHandle, ResourceKind, Segment,
};
use async_trait::async_trait;
use reqwest::Method;
use std::fmt;

pub const GRAMMAR: HandleGrammar = HandleGrammar::new(
    RobotsTxt::NAME,
    &[Segment::Id("siteId"), Segment::Literal("robots.txt")],
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotsTxtId {
    pub site_id: String,
}

impl fmt::Display for RobotsTxtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "robots.txt of site '{}'", self.site_id)
    }
}

/// The robots.txt resource kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct RobotsTxt;

fn path(site_id: &str) -> String {
    format!("/v2/sites/{site_id}/robots_txt")
}

impl RobotsTxt {
    /// PUT is create-or-replace, so Create and Update share it.
    async fn put(
        &self,
        api: &ApiClient,
        ctx: &OperationContext,
        desired: &RobotsTxtDesired,
    ) -> Result<RobotsTxtObserved, ReconcileError> {
        let id = RobotsTxtId {
            site_id: desired.site_id.clone(),
        };
        let sent = parse_content(&desired.content);
        let request = ApiRequest::new(Method::PUT, path(&id.site_id)).with_json(&sent)?;
        let echoed: RobotsTxtBody = api
            .send_json(&id.to_string(), &ctx.cancel, request)
            .await?;

        let content = if echoed == sent {
            desired.content.clone()
        } else {
            format_content(&echoed)
        };
        Ok(RobotsTxtObserved {
            site_id: id.site_id,
            content,
            last_modified: Some(now_rfc3339()),
        })
    }
}

#[async_trait]
impl ResourceKind for RobotsTxt {
    const NAME: &'static str = "robots.txt";

    type Id = RobotsTxtId;
    type Desired = RobotsTxtDesired;
    type Observed = RobotsTxtObserved;

    fn encode_id(&self, id: &RobotsTxtId) -> Result<ResourceHandle, ReconcileError> {
        GRAMMAR.encode(&[&id.site_id])
    }

    fn decode_id(&self, handle: &ResourceHandle) -> Result<RobotsTxtId, ReconcileError> {
        let [site_id]: [String; 1] = GRAMMAR
            .decode(handle)?
            .try_into()
            .map_err(|_| ReconcileError::MalformedHandle {
                resource: Self::NAME,
                handle: handle.to_string(),
                expected: GRAMMAR.layout(),
            })?;
        Ok(RobotsTxtId { site_id })
    }

    fn validate(&self, ctx: &OperationContext, desired: &RobotsTxtDesired) -> Vec<FieldError> {
        let mut v = Validator::new();
        v.check(check_site_id("siteId", &desired.site_id, ctx.dry_run)).check(non_empty(
            "content",
            &desired.content,
            "robots.txt directives such as 'User-agent: *'",
            "provide at least one directive, e.g. 'User-agent: *\\nAllow: /'",
        ));
        v.into_errors()
    }

    fn diff(&self, desired: &RobotsTxtDesired, observed: &RobotsTxtObserved) -> DiffSet {
        let mut diff = DiffSet::new();
        diff.compare(
            "siteId",
            &desired.site_id,
            &observed.site_id,
            ChangeKind::Replace,
        );
        if !same_directives(&desired.content, &observed.content) {
            diff.record("content", ChangeKind::Update);
        }
        diff
    }

    fn preview(
        &self,
        desired: &RobotsTxtDesired,
        prior: Option<&RobotsTxtObserved>,
    ) -> Result<Applied<RobotsTxtObserved>, ReconcileError> {
        let handle = self.encode_id(&RobotsTxtId {
            site_id: desired.site_id.clone(),
        })?;
        Ok(Applied {
            handle,
            observed: RobotsTxtObserved {
                site_id: desired.site_id.clone(),
                content: desired.content.clone(),
                last_modified: prior.and_then(|p| p.last_modified.clone()),
            },
        })
    }

    async fn on_create(
        &self,
        api: &ApiClient,
        ctx: &OperationContext,
        desired: &RobotsTxtDesired,
    ) -> Result<Applied<RobotsTxtObserved>, ReconcileError> {
        let observed = self.put(api, ctx, desired).await?;
        let handle = self.encode_id(&RobotsTxtId {
            site_id: observed.site_id.clone(),
        })?;
        Ok(Applied { handle, observed })
    }

    async fn on_read(
        &self,
        api: &ApiClient,
        ctx: &OperationContext,
        id: &RobotsTxtId,
    ) -> Result<Option<RobotsTxtObserved>, ReconcileError> {
        let body: RobotsTxtBody = api
            .send_json(&id.to_string(), &ctx.cancel, ApiRequest::get(path(&id.site_id)))
            .await?;
        Ok(Some(RobotsTxtObserved {
            site_id: id.site_id.clone(),
            content: format_content(&body),
            last_modified: None,
        }))
    }

    async fn on_update(
        &self,
        api: &ApiClient,
        ctx: &OperationContext,
        _id: &RobotsTxtId,
        desired: &RobotsTxtDesired,
        _prior: &RobotsTxtObserved,
    ) -> Result<RobotsTxtObserved, ReconcileError> {
        self.put(api, ctx, desired).await
    }

    async fn on_delete(
        &self,
        api: &ApiClient,
        ctx: &OperationContext,
        id: &RobotsTxtId,
    ) -> Result<(), ReconcileError> {
        api.send(&id.to_string(), &ctx.cancel, ApiRequest::delete(path(&id.site_id)))
            .await?;
        Ok(())
    }
}
