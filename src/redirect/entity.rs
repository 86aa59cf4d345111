//! [`ResourceKind`] implementation for site redirects.
//!
//! The API has no in-place update for redirects, so every change is classified as `Replace`
//! and the reconciler deletes and recreates the rule. Reads list the site's redirects and pick
//! the one with the handle's id.

use crate::domain::{
    check_site_id, preview_id, RedirectDesired, RedirectList, RedirectObserved, RedirectRule,
};
use crate::framework::validation::{matches, non_empty, one_of, Validator};
use crate::framework::{
    ApiClient, ApiRequest, Applied, ChangeKind, DiffSet, FieldError, HandleGrammar,
    OperationContext, ReconcileError, ResourceHandle, ResourceKind, Segment,
};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Method;
use std::fmt;
use std::sync::LazyLock;

pub const GRAMMAR: HandleGrammar = HandleGrammar::new(
    Redirect::NAME,
    &[
        Segment::Id("siteId"),
        Segment::Literal("redirects"),
        Segment::Id("redirectId"),
    ],
);

pub const STATUS_CODES: [u16; 2] = [301, 302];

static PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[a-zA-Z0-9\-_/.]*$").expect("redirect path pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectId {
    pub site_id: String,
    pub redirect_id: String,
}

impl fmt::Display for RedirectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "redirect '{}' on site '{}'", self.redirect_id, self.site_id)
    }
}

/// The redirect resource kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct Redirect;

fn collection_path(site_id: &str) -> String {
    format!("/v2/sites/{site_id}/redirects")
}

fn check_path(field: &'static str, value: &str) -> Option<FieldError> {
    non_empty(
        field,
        value,
        "a path starting with '/'",
        "provide a site-relative path such as '/old-page'",
    )
    .or_else(|| {
        matches(
            field,
            value,
            &PATH,
            "a path starting with '/' containing only letters, digits, '-', '_', '.' and '/'",
            "remove query strings, spaces and other special characters; use the path only, e.g. '/blog/post-1'",
        )
    })
}

fn observed_from(site_id: &str, rule: RedirectRule) -> RedirectObserved {
    RedirectObserved {
        site_id: site_id.to_string(),
        redirect_id: rule.id,
        source_path: rule.source_path,
        destination_path: rule.destination_path,
        status_code: rule.status_code,
        created_on: rule.created_on,
    }
}

#[async_trait]
impl ResourceKind for Redirect {
    const NAME: &'static str = "redirect";

    type Id = RedirectId;
    type Desired = RedirectDesired;
    type Observed = RedirectObserved;

    fn encode_id(&self, id: &RedirectId) -> Result<ResourceHandle, ReconcileError> {
        GRAMMAR.encode(&[&id.site_id, &id.redirect_id])
    }

    fn decode_id(&self, handle: &ResourceHandle) -> Result<RedirectId, ReconcileError> {
        let [site_id, redirect_id]: [String; 2] =
            GRAMMAR
                .decode(handle)?
                .try_into()
                .map_err(|_| ReconcileError::MalformedHandle {
                    resource: Self::NAME,
                    handle: handle.to_string(),
                    expected: GRAMMAR.layout(),
                })?;
        Ok(RedirectId {
            site_id,
            redirect_id,
        })
    }

    fn validate(&self, ctx: &OperationContext, desired: &RedirectDesired) -> Vec<FieldError> {
        let mut v = Validator::new();
        v.check(check_site_id("siteId", &desired.site_id, ctx.dry_run))
            .check(check_path("sourcePath", &desired.source_path))
            .check(check_path("destinationPath", &desired.destination_path))
            .check(one_of(
                "statusCode",
                &desired.status_code,
                &STATUS_CODES,
                "use 301 for a permanent redirect or 302 for a temporary one",
            ));

        if !desired.source_path.is_empty() && desired.source_path == desired.destination_path {
            v.check(Some(FieldError::new(
                "destinationPath",
                &desired.destination_path,
                "a path different from sourcePath",
                "a redirect to itself would loop; point it at another page",
            )));
        }
        v.into_errors()
    }

    fn diff(&self, desired: &RedirectDesired, observed: &RedirectObserved) -> DiffSet {
        let mut diff = DiffSet::new();
        diff.compare(
            "siteId",
            &desired.site_id,
            &observed.site_id,
            ChangeKind::Replace,
        );
        diff.compare(
            "sourcePath",
            &desired.source_path,
            &observed.source_path,
            ChangeKind::Replace,
        );
        diff.compare(
            "destinationPath",
            &desired.destination_path,
            &observed.destination_path,
            ChangeKind::Replace,
        );
        // Older API revisions omit the status code.
        if observed.status_code != 0 {
            diff.compare(
                "statusCode",
                &desired.status_code,
                &observed.status_code,
                ChangeKind::Replace,
            );
        }
        diff
    }

    fn preview(
        &self,
        desired: &RedirectDesired,
        _prior: Option<&RedirectObserved>,
    ) -> Result<Applied<RedirectObserved>, ReconcileError> {
        let redirect_id = preview_id();
        let handle = self.encode_id(&RedirectId {
            site_id: desired.site_id.clone(),
            redirect_id: redirect_id.clone(),
        })?;
        Ok(Applied {
            handle,
            observed: RedirectObserved {
                site_id: desired.site_id.clone(),
                redirect_id,
                source_path: desired.source_path.clone(),
                destination_path: desired.destination_path.clone(),
                status_code: desired.status_code,
                created_on: None,
            },
        })
    }

    async fn on_create(
        &self,
        api: &ApiClient,
        ctx: &OperationContext,
        desired: &RedirectDesired,
    ) -> Result<Applied<RedirectObserved>, ReconcileError> {
        let label = format!(
            "redirect '{}' on site '{}'",
            desired.source_path, desired.site_id
        );
        let body = RedirectRule {
            source_path: desired.source_path.clone(),
            destination_path: desired.destination_path.clone(),
            status_code: desired.status_code,
            ..RedirectRule::default()
        };
        let request =
            ApiRequest::new(Method::POST, collection_path(&desired.site_id)).with_json(&body)?;
        let mut created: RedirectRule = api.send_json(&label, &ctx.cancel, request).await?;

        if created.id.is_empty() {
            return Err(ReconcileError::Decode {
                resource: label,
                detail: "create response carried no redirect id".into(),
            });
        }
        if created.status_code == 0 {
            created.status_code = desired.status_code;
        }

        let observed = observed_from(&desired.site_id, created);
        let handle = self.encode_id(&RedirectId {
            site_id: observed.site_id.clone(),
            redirect_id: observed.redirect_id.clone(),
        })?;
        Ok(Applied { handle, observed })
    }

    async fn on_read(
        &self,
        api: &ApiClient,
        ctx: &OperationContext,
        id: &RedirectId,
    ) -> Result<Option<RedirectObserved>, ReconcileError> {
        let list: RedirectList = api
            .send_json(
                &id.to_string(),
                &ctx.cancel,
                ApiRequest::get(collection_path(&id.site_id)),
            )
            .await?;
        Ok(list
            .redirects
            .into_iter()
            .find(|rule| rule.id == id.redirect_id)
            .map(|rule| observed_from(&id.site_id, rule)))
    }

    async fn on_delete(
        &self,
        api: &ApiClient,
        ctx: &OperationContext,
        id: &RedirectId,
    ) -> Result<(), ReconcileError> {
        let path = format!("{}/{}", collection_path(&id.site_id), id.redirect_id);
        api.send(&id.to_string(), &ctx.cancel, ApiRequest::delete(path))
            .await?;
        Ok(())
    }
}
