//! [`ResourceKind`] implementation for Webflow sites.
//!
//! `workspaceId` cannot move, so changing it replaces the site. `displayName` and
//! `parentFolderId` are patched in place, and `publish` triggers a publish request after a
//! successful write. `shortName` and `templateName` are never diffed: the remote derives the
//! first and only reads the second at creation.

use crate::domain::{
    now_rfc3339, preview_id, SiteCreateRequest, SiteDesired, SiteObserved, SitePublishRequest,
    SiteRecord, SiteUpdateRequest,
};
use crate::framework::validation::{matches, max_chars, non_empty, Validator};
use crate::framework::{
    ApiClient, ApiRequest, Applied, ChangeKind, DiffSet, FieldError, HandleGrammar,
    OperationContext, ReconcileError, ResourceHandle, ResourceKind, Segment,
};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Method;
use std::fmt;
use std::sync::LazyLock;
use tracing::{info, warn};

pub const GRAMMAR: HandleGrammar = HandleGrammar::new(Site::NAME, &[Segment::Id("siteId")]);

pub const MAX_DISPLAY_NAME_CHARS: usize = 255;

static SHORT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("short name pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteId(pub String);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site '{}'", self.0)
    }
}

/// The site resource kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct Site;

fn site_path(site_id: &str) -> String {
    format!("/v2/sites/{site_id}")
}

/// Maps the API record onto observed state. `workspaceId` and `templateName` are not part of
/// every response, so they come from `known` when present.
fn observed_from(record: SiteRecord, known: &SiteObserved) -> SiteObserved {
    let custom_domains = record.domain_urls();
    SiteObserved {
        site_id: record.id,
        workspace_id: record
            .workspace_id
            .unwrap_or_else(|| known.workspace_id.clone()),
        display_name: record.display_name,
        short_name: record.short_name,
        parent_folder_id: record.parent_folder_id,
        template_name: known.template_name.clone(),
        publish: record.last_published.is_some(),
        time_zone: record.time_zone,
        last_published: record.last_published,
        last_updated: record.last_updated,
        preview_url: record.preview_url,
        custom_domains,
        data_collection_enabled: record.data_collection_enabled,
        data_collection_type: record.data_collection_type,
    }
}

impl Site {
    async fn publish(
        &self,
        api: &ApiClient,
        ctx: &OperationContext,
        observed: &mut SiteObserved,
    ) -> Result<(), ReconcileError> {
        let request = ApiRequest::new(
            Method::POST,
            format!("{}/publish", site_path(&observed.site_id)),
        )
        .with_json(&SitePublishRequest {
            domains: observed.custom_domains.clone(),
        })?;
        api.send(&SiteId(observed.site_id.clone()).to_string(), &ctx.cancel, request)
            .await?;

        info!(site_id = %observed.site_id, "Publish requested");
        observed.publish = true;
        observed.last_published = Some(now_rfc3339());
        Ok(())
    }
}

#[async_trait]
impl ResourceKind for Site {
    const NAME: &'static str = "site";

    type Id = SiteId;
    type Desired = SiteDesired;
    type Observed = SiteObserved;

    fn encode_id(&self, id: &SiteId) -> Result<ResourceHandle, ReconcileError> {
        GRAMMAR.encode(&[&id.0])
    }

    fn decode_id(&self, handle: &ResourceHandle) -> Result<SiteId, ReconcileError> {
        let [site_id]: [String; 1] = GRAMMAR
            .decode(handle)?
            .try_into()
            .map_err(|_| ReconcileError::MalformedHandle {
                resource: Self::NAME,
                handle: handle.to_string(),
                expected: GRAMMAR.layout(),
            })?;
        Ok(SiteId(site_id))
    }

    fn validate(&self, _ctx: &OperationContext, desired: &SiteDesired) -> Vec<FieldError> {
        let mut v = Validator::new();
        v.check(non_empty(
            "workspaceId",
            &desired.workspace_id,
            "the id of the workspace that owns the site",
            "copy the workspace id from the Webflow dashboard under Workspace Settings",
        ))
        .check(
            non_empty(
                "displayName",
                &desired.display_name,
                "1 to 255 characters",
                "give the site a name such as 'Marketing Site'",
            )
            .or_else(|| {
                max_chars(
                    "displayName",
                    &desired.display_name,
                    MAX_DISPLAY_NAME_CHARS,
                    "shorten the site name",
                )
            }),
        );
        if let Some(short_name) = &desired.short_name {
            v.check(matches(
                "shortName",
                short_name,
                &SHORT_NAME,
                "lowercase letters and digits separated by single hyphens (e.g. 'my-site')",
                "remove uppercase letters, spaces and leading, trailing or repeated hyphens",
            ));
        }
        v.into_errors()
    }

    fn diff(&self, desired: &SiteDesired, observed: &SiteObserved) -> DiffSet {
        let mut diff = DiffSet::new();
        // An empty observed workspace means the API did not report it.
        if !observed.workspace_id.is_empty() {
            diff.compare(
                "workspaceId",
                &desired.workspace_id,
                &observed.workspace_id,
                ChangeKind::Replace,
            );
        }
        diff.compare(
            "displayName",
            &desired.display_name,
            &observed.display_name,
            ChangeKind::Update,
        );
        if desired.parent_folder_id.is_some() {
            diff.compare(
                "parentFolderId",
                &desired.parent_folder_id,
                &observed.parent_folder_id,
                ChangeKind::Update,
            );
        }
        if desired.publish && !observed.publish {
            diff.record("publish", ChangeKind::Update);
        }
        diff
    }

    fn preview(
        &self,
        desired: &SiteDesired,
        prior: Option<&SiteObserved>,
    ) -> Result<Applied<SiteObserved>, ReconcileError> {
        let observed = match prior {
            Some(prior) => SiteObserved {
                display_name: desired.display_name.clone(),
                parent_folder_id: desired
                    .parent_folder_id
                    .clone()
                    .or_else(|| prior.parent_folder_id.clone()),
                publish: prior.publish || desired.publish,
                ..prior.clone()
            },
            None => SiteObserved {
                site_id: preview_id(),
                workspace_id: desired.workspace_id.clone(),
                display_name: desired.display_name.clone(),
                short_name: desired.short_name.clone(),
                parent_folder_id: desired.parent_folder_id.clone(),
                template_name: desired.template_name.clone(),
                publish: desired.publish,
                ..SiteObserved::default()
            },
        };
        let handle = self.encode_id(&SiteId(observed.site_id.clone()))?;
        Ok(Applied { handle, observed })
    }

    async fn on_create(
        &self,
        api: &ApiClient,
        ctx: &OperationContext,
        desired: &SiteDesired,
    ) -> Result<Applied<SiteObserved>, ReconcileError> {
        let label = format!(
            "site '{}' in workspace '{}'",
            desired.display_name, desired.workspace_id
        );
        let request = ApiRequest::new(
            Method::POST,
            format!("/v2/workspaces/{}/sites", desired.workspace_id),
        )
        .with_json(&SiteCreateRequest {
            name: desired.display_name.clone(),
            template_name: desired.template_name.clone(),
            parent_folder_id: desired.parent_folder_id.clone(),
        })?;
        let record: SiteRecord = api.send_json(&label, &ctx.cancel, request).await?;
        if record.id.is_empty() {
            return Err(ReconcileError::Decode {
                resource: label,
                detail: "create response carried no site id".into(),
            });
        }

        let known = SiteObserved {
            workspace_id: desired.workspace_id.clone(),
            template_name: desired.template_name.clone(),
            ..SiteObserved::default()
        };
        let mut observed = observed_from(record, &known);

        let handle = self.encode_id(&SiteId(observed.site_id.clone()))?;
        // The site exists now; a failed publish is retried by the next update.
        if desired.publish {
            match self.publish(api, ctx, &mut observed).await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {
                    warn!(site_id = %observed.site_id, "Publish after create cancelled");
                    return Err(ReconcileError::PartiallyApplied {
                        resource: label,
                        handle,
                        step: "publish",
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    warn!(site_id = %observed.site_id, error = %e, "Publish after create failed");
                }
            }
        }

        Ok(Applied { handle, observed })
    }

    async fn on_read(
        &self,
        api: &ApiClient,
        ctx: &OperationContext,
        id: &SiteId,
    ) -> Result<Option<SiteObserved>, ReconcileError> {
        let record: SiteRecord = api
            .send_json(&id.to_string(), &ctx.cancel, ApiRequest::get(site_path(&id.0)))
            .await?;
        Ok(Some(observed_from(record, &SiteObserved::default())))
    }

    async fn on_update(
        &self,
        api: &ApiClient,
        ctx: &OperationContext,
        id: &SiteId,
        desired: &SiteDesired,
        prior: &SiteObserved,
    ) -> Result<SiteObserved, ReconcileError> {
        let request = ApiRequest::new(Method::PATCH, site_path(&id.0)).with_json(
            &SiteUpdateRequest {
                name: desired.display_name.clone(),
                parent_folder_id: desired
                    .parent_folder_id
                    .clone()
                    .or_else(|| prior.parent_folder_id.clone()),
            },
        )?;
        let record: SiteRecord = api.send_json(&id.to_string(), &ctx.cancel, request).await?;

        let mut observed = observed_from(record, prior);
        if desired.publish {
            self.publish(api, ctx, &mut observed).await?;
        }
        Ok(observed)
    }

    async fn on_delete(
        &self,
        api: &ApiClient,
        ctx: &OperationContext,
        id: &SiteId,
    ) -> Result<(), ReconcileError> {
        api.send(&id.to_string(), &ctx.cancel, ApiRequest::delete(site_path(&id.0)))
            .await?;
        Ok(())
    }
}
