use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use webflow_reconcile::domain::{
    RedirectDesired, RedirectObserved, RobotsTxtDesired, RobotsTxtObserved, SiteDesired,
    SiteObserved,
};
use webflow_reconcile::framework::mock::MockTransport;
use webflow_reconcile::framework::{
    Observation, OperationContext, ReconcileError, ReplacePolicy, ResourceHandle, RetryPolicy,
};
use webflow_reconcile::lifecycle::{DesiredResource, ObservedResource, ProviderSystem};

const SITE: &str = "5f0c8c9e1c9d440000e8d8c3";
const ROBOTS_PATH: &str = "/v2/sites/5f0c8c9e1c9d440000e8d8c3/robots_txt";
const REDIRECTS_PATH: &str = "/v2/sites/5f0c8c9e1c9d440000e8d8c3/redirects";
const SITE_PATH: &str = "/v2/sites/5f0c8c9e1c9d440000e8d8c3";

fn system(mock: &MockTransport) -> ProviderSystem {
    ProviderSystem::with_transport(Arc::new(mock.clone()), RetryPolicy::default())
}

fn redirect_rule(id: &str, from: &str, to: &str, status: u16) -> serde_json::Value {
    json!({
        "id": id,
        "fromUrl": from,
        "toUrl": to,
        "statusCode": status,
        "createdOn": "2024-01-01T00:00:00Z",
    })
}

fn existing_redirect() -> RedirectObserved {
    RedirectObserved {
        site_id: SITE.into(),
        redirect_id: "r1".into(),
        source_path: "/old".into(),
        destination_path: "/new".into(),
        status_code: 301,
        created_on: None,
    }
}

fn site_record(name: &str, last_published: Option<&str>) -> serde_json::Value {
    json!({
        "id": SITE,
        "workspaceId": "ws-1",
        "displayName": name,
        "shortName": "marketing",
        "timeZone": "Europe/Berlin",
        "lastPublished": last_published,
        "previewUrl": "https://marketing.webflow.io",
        "customDomains": [{"id": "d1", "url": "www.example.com"}],
    })
}

fn site_desired() -> SiteDesired {
    SiteDesired {
        workspace_id: "ws-1".into(),
        display_name: "Marketing".into(),
        short_name: Some("marketing".into()),
        parent_folder_id: None,
        template_name: Some("blank".into()),
        publish: false,
    }
}

// =============================================================================
// robots.txt
// =============================================================================

/// Declared text survives a create when the remote stores exactly what was sent, and a later
/// update with reformatted text sends nothing.
#[tokio::test]
async fn test_robots_txt_create_keeps_declared_text() {
    let mock = MockTransport::new();
    mock.expect(Method::PUT, ROBOTS_PATH).echo(200);
    let system = system(&mock);
    let ctx = OperationContext::default();

    let content = "User-agent: *\nAllow: /\n\nSitemap: https://example.com/sitemap.xml";
    let applied = system
        .robots_txt
        .create(&ctx, &RobotsTxtDesired::new(SITE, content))
        .await
        .unwrap();

    assert_eq!(applied.handle.as_str(), format!("{SITE}/robots.txt"));
    assert_eq!(applied.observed.content, content);
    assert!(applied.observed.last_modified.is_some());

    let body = mock.calls()[0].body.clone().unwrap();
    assert_eq!(body["rules"][0]["userAgent"], "*");
    assert_eq!(body["rules"][0]["allows"][0], "/");
    assert_eq!(body["sitemap"], "https://example.com/sitemap.xml");

    let reformatted = RobotsTxtDesired::new(
        SITE,
        "user-agent: *\nallow: /\nsitemap: https://example.com/sitemap.xml\n",
    );
    let again = system
        .robots_txt
        .update(&ctx, &applied.handle, &reformatted, &applied.observed)
        .await
        .unwrap();
    assert_eq!(again, applied);

    mock.verify();
    assert_eq!(mock.call_count(), 1);
}

/// Text with no recognized directive is sent as an empty rule set and still kept verbatim.
#[tokio::test]
async fn test_robots_txt_opaque_content_echo() {
    let mock = MockTransport::new();
    mock.expect(Method::PUT, "/v2/sites/abc123def456abc123def456/robots_txt")
        .echo(200);
    let system = system(&mock);

    let applied = system
        .robots_txt
        .create(
            &OperationContext::default(),
            &RobotsTxtDesired::new("abc123def456abc123def456", "rule-a"),
        )
        .await
        .unwrap();

    assert_eq!(applied.handle.as_str(), "abc123def456abc123def456/robots.txt");
    assert_eq!(applied.observed.site_id, "abc123def456abc123def456");
    assert_eq!(applied.observed.content, "rule-a");
    assert_eq!(mock.calls()[0].body, Some(json!({})));
}

#[tokio::test]
async fn test_robots_txt_normalized_by_remote() {
    let mock = MockTransport::new();
    mock.expect(Method::PUT, ROBOTS_PATH).respond_json(
        200,
        json!({"rules": [{"userAgent": "*", "allows": null, "disallows": ["/admin/"]}], "sitemap": null}),
    );
    let system = system(&mock);

    let desired = RobotsTxtDesired::new(SITE, "User-agent: *\nDisallow: /admin/\nDisallow: /tmp/");
    let applied = system
        .robots_txt
        .create(&OperationContext::default(), &desired)
        .await
        .unwrap();

    assert_eq!(applied.observed.content, "User-agent: *\nDisallow: /admin/\n");
    mock.verify();
}

#[tokio::test]
async fn test_robots_txt_content_change_is_put_in_place() {
    let mock = MockTransport::new();
    mock.expect(Method::PUT, ROBOTS_PATH).echo(200);
    let system = system(&mock);

    let handle = ResourceHandle::new(format!("{SITE}/robots.txt"));
    let prior = RobotsTxtObserved {
        site_id: SITE.into(),
        content: "User-agent: *\nAllow: /\n".into(),
        last_modified: None,
    };
    let desired = RobotsTxtDesired::new(SITE, "User-agent: *\nDisallow: /\n");
    let applied = system
        .robots_txt
        .update(&OperationContext::default(), &handle, &desired, &prior)
        .await
        .unwrap();

    assert_eq!(applied.handle, handle);
    assert_eq!(applied.observed.content, desired.content);
    assert_eq!(mock.call_log(), vec![format!("PUT {ROBOTS_PATH}")]);
}

#[tokio::test]
async fn test_robots_txt_read_formats_rules() {
    let mock = MockTransport::new();
    mock.expect(Method::GET, ROBOTS_PATH).respond_json(
        200,
        json!({"rules": [{"userAgent": "Googlebot", "allows": ["/"], "disallows": []}], "sitemap": "https://example.com/s.xml"}),
    );
    let system = system(&mock);

    let observed = system
        .robots_txt
        .read(&OperationContext::default(), &ResourceHandle::new(format!("{SITE}/robots.txt")))
        .await
        .unwrap()
        .into_option()
        .unwrap();
    assert_eq!(
        observed.content,
        "User-agent: Googlebot\nAllow: /\n\nSitemap: https://example.com/s.xml\n"
    );
}

// =============================================================================
// Redirects
// =============================================================================

#[tokio::test]
async fn test_redirect_create_mints_handle() {
    let mock = MockTransport::new();
    mock.expect(Method::POST, REDIRECTS_PATH)
        .respond_json(200, redirect_rule("r1", "/old", "/new", 301));
    let system = system(&mock);

    let applied = system
        .redirects
        .create(
            &OperationContext::default(),
            &RedirectDesired::new(SITE, "/old", "/new", 301),
        )
        .await
        .unwrap();

    assert_eq!(applied.handle.as_str(), format!("{SITE}/redirects/r1"));
    assert_eq!(applied.observed.redirect_id, "r1");
    assert_eq!(applied.observed.created_on.as_deref(), Some("2024-01-01T00:00:00Z"));

    let body = mock.calls()[0].body.clone().unwrap();
    assert_eq!(body, json!({"fromUrl": "/old", "toUrl": "/new", "statusCode": 301}));
    mock.verify();
}

/// A changed destination deletes the old rule and creates a new one with a new handle.
#[tokio::test]
async fn test_redirect_update_replaces() {
    let mock = MockTransport::new();
    mock.expect(Method::DELETE, format!("{REDIRECTS_PATH}/r1"))
        .respond(204, "");
    mock.expect(Method::POST, REDIRECTS_PATH)
        .respond_json(200, redirect_rule("r2", "/old", "/newer", 301));
    let system = system(&mock);

    let old = ResourceHandle::new(format!("{SITE}/redirects/r1"));
    let applied = system
        .redirects
        .update(
            &OperationContext::default(),
            &old,
            &RedirectDesired::new(SITE, "/old", "/newer", 301),
            &existing_redirect(),
        )
        .await
        .unwrap();

    assert_eq!(applied.handle.as_str(), format!("{SITE}/redirects/r2"));
    assert_eq!(applied.observed.destination_path, "/newer");
    assert_eq!(
        mock.call_log(),
        vec![
            format!("DELETE {REDIRECTS_PATH}/r1"),
            format!("POST {REDIRECTS_PATH}"),
        ]
    );
}

#[tokio::test]
async fn test_redirect_status_code_change_replaces() {
    let mock = MockTransport::new();
    mock.expect(Method::DELETE, format!("{REDIRECTS_PATH}/r1"))
        .respond(204, "");
    mock.expect(Method::POST, REDIRECTS_PATH)
        .respond_json(200, redirect_rule("r2", "/old", "/new", 302));
    let system = system(&mock);

    let desired = RedirectDesired::new(SITE, "/old", "/new", 302);
    let diff = system.redirects.diff(&desired, &existing_redirect());
    assert_eq!(diff.fields(), vec!["statusCode"]);
    assert!(diff.requires_replace());

    let applied = system
        .redirects
        .update(
            &OperationContext::default(),
            &ResourceHandle::new(format!("{SITE}/redirects/r1")),
            &desired,
            &existing_redirect(),
        )
        .await
        .unwrap();

    assert_eq!(applied.observed.status_code, 302);
    assert!(mock.calls().iter().all(|c| c.method != Method::PATCH && c.method != Method::PUT));
    mock.verify();
}

#[tokio::test]
async fn test_redirect_replace_forbidden() {
    let mock = MockTransport::new();
    let system = system(&mock);
    let ctx = OperationContext::default().with_replace_policy(ReplacePolicy::Forbid);

    let err = system
        .redirects
        .update(
            &ctx,
            &ResourceHandle::new(format!("{SITE}/redirects/r1")),
            &RedirectDesired::new(SITE, "/old", "/newer", 301),
            &existing_redirect(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Conflict { .. }));
    assert!(err.to_string().contains("destinationPath"));
    assert_eq!(mock.call_count(), 0);
}

/// A redirect deleted out of band reads as absent instead of failing.
#[tokio::test]
async fn test_redirect_deleted_out_of_band_reads_absent() {
    let mock = MockTransport::new();
    mock.expect(Method::GET, REDIRECTS_PATH).respond_json(
        200,
        json!({"redirects": [redirect_rule("r9", "/a", "/b", 302)]}),
    );
    let system = system(&mock);

    let observation = system
        .redirects
        .read(
            &OperationContext::default(),
            &ResourceHandle::new(format!("{SITE}/redirects/r1")),
        )
        .await
        .unwrap();
    assert!(observation.is_absent());
}

#[tokio::test]
async fn test_redirect_validation_sends_nothing() {
    let mock = MockTransport::new();
    let system = system(&mock);

    let err = system
        .redirects
        .create(
            &OperationContext::default(),
            &RedirectDesired::new("not-a-site", "old", "/same?x=1", 307),
        )
        .await
        .unwrap_err();

    match err {
        ReconcileError::Validation { resource, errors } => {
            assert_eq!(resource, "redirect");
            assert_eq!(errors.len(), 4);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_redirect_dry_run_sends_nothing() {
    let mock = MockTransport::new();
    let system = system(&mock);

    let applied = system
        .redirects
        .create(
            &OperationContext::preview(),
            &RedirectDesired::new(SITE, "/old", "/new", 302),
        )
        .await
        .unwrap();

    assert!(applied
        .handle
        .as_str()
        .starts_with(&format!("{SITE}/redirects/preview-")));
    assert_eq!(applied.observed.status_code, 302);
    assert_eq!(mock.call_count(), 0);
}

/// An update whose desired state matches the prior observation sends nothing.
#[tokio::test]
async fn test_redirect_unchanged_update_sends_nothing() {
    let mock = MockTransport::new();
    let system = system(&mock);

    let handle = ResourceHandle::new(format!("{SITE}/redirects/r1"));
    let prior = existing_redirect();
    let applied = system
        .redirects
        .update(
            &OperationContext::default(),
            &handle,
            &RedirectDesired::new(SITE, "/old", "/new", 301),
            &prior,
        )
        .await
        .unwrap();

    assert_eq!(applied.handle, handle);
    assert_eq!(applied.observed, prior);
    assert_eq!(mock.call_count(), 0);
}

/// A site id minted by a dry run resolves in the next dry run but is refused when applying.
#[tokio::test]
async fn test_placeholder_site_id_only_valid_in_dry_run() {
    let mock = MockTransport::new();
    let system = system(&mock);

    let site = system
        .sites
        .create(&OperationContext::preview(), &site_desired())
        .await
        .unwrap();
    let placeholder = site.observed.site_id.clone();
    assert!(placeholder.starts_with("preview-"));

    let desired = RedirectDesired::new(&placeholder, "/old", "/new", 301);
    let previewed = system
        .redirects
        .create(&OperationContext::preview(), &desired)
        .await
        .unwrap();
    assert_eq!(previewed.observed.site_id, placeholder);

    let err = system
        .redirects
        .create(&OperationContext::default(), &desired)
        .await
        .unwrap_err();
    match &err {
        ReconcileError::Validation { resource, errors } => {
            assert_eq!(*resource, "redirect");
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].field, "siteId");
            assert_eq!(errors[0].value, placeholder);
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let err = system
        .robots_txt
        .create(
            &OperationContext::default(),
            &RobotsTxtDesired::new(&placeholder, "User-agent: *\nAllow: /"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Validation { resource: "robots.txt", .. }));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_placeholder_handle_refused_outside_dry_run() {
    let mock = MockTransport::new();
    let system = system(&mock);

    let previewed = system
        .redirects
        .create(
            &OperationContext::preview(),
            &RedirectDesired::new(SITE, "/old", "/new", 301),
        )
        .await
        .unwrap();
    let desired = RedirectDesired::new(SITE, "/old", "/newer", 301);

    let replanned = system
        .redirects
        .update(
            &OperationContext::preview(),
            &previewed.handle,
            &desired,
            &previewed.observed,
        )
        .await
        .unwrap();
    assert_eq!(replanned.observed.destination_path, "/newer");

    let err = system
        .redirects
        .update(
            &OperationContext::default(),
            &previewed.handle,
            &desired,
            &previewed.observed,
        )
        .await
        .unwrap_err();
    match &err {
        ReconcileError::Validation { errors, .. } => assert_eq!(errors[0].field, "handle"),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let mock = MockTransport::new();
    mock.expect(Method::DELETE, format!("{REDIRECTS_PATH}/r1"))
        .respond(204, "");
    mock.expect(Method::DELETE, format!("{REDIRECTS_PATH}/r1"))
        .not_found();
    let system = system(&mock);
    let ctx = OperationContext::default();
    let handle = ResourceHandle::new(format!("{SITE}/redirects/r1"));

    system.redirects.delete(&ctx, &handle).await.unwrap();
    system.redirects.delete(&ctx, &handle).await.unwrap();
    mock.verify();
}

#[tokio::test]
async fn test_malformed_handle_is_terminal() {
    let mock = MockTransport::new();
    let system = system(&mock);

    let err = system
        .redirects
        .delete(
            &OperationContext::default(),
            &ResourceHandle::new(format!("{SITE}/redirects/")),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::MalformedHandle { resource: "redirect", .. }));
    assert_eq!(mock.call_count(), 0);
}

// =============================================================================
// Sites
// =============================================================================

#[tokio::test]
async fn test_site_create_then_publish() {
    let mock = MockTransport::new();
    mock.expect(Method::POST, "/v2/workspaces/ws-1/sites")
        .respond_json(200, site_record("Marketing", None));
    mock.expect(Method::POST, format!("{SITE_PATH}/publish"))
        .respond_json(202, json!({"published": true}));
    let system = system(&mock);

    let desired = SiteDesired {
        publish: true,
        ..site_desired()
    };
    let applied = system
        .sites
        .create(&OperationContext::default(), &desired)
        .await
        .unwrap();

    assert_eq!(applied.handle.as_str(), SITE);
    assert!(applied.observed.publish);
    assert!(applied.observed.last_published.is_some());
    assert_eq!(applied.observed.template_name.as_deref(), Some("blank"));
    assert_eq!(applied.observed.custom_domains, vec!["www.example.com"]);

    let calls = mock.calls();
    assert_eq!(
        calls[0].body.clone().unwrap(),
        json!({"name": "Marketing", "templateName": "blank"})
    );
    assert_eq!(
        calls[1].body.clone().unwrap(),
        json!({"domains": ["www.example.com"]})
    );
    mock.verify();
}

/// The site exists once the POST succeeds, so a failed publish still yields its handle.
#[tokio::test]
async fn test_site_publish_failure_after_create_keeps_handle() {
    let mock = MockTransport::new();
    mock.expect(Method::POST, "/v2/workspaces/ws-1/sites")
        .respond_json(200, site_record("Marketing", None));
    mock.expect(Method::POST, format!("{SITE_PATH}/publish"))
        .respond_json(403, json!({"message": "Missing sites:write scope"}));
    let system = system(&mock);

    let desired = SiteDesired {
        publish: true,
        ..site_desired()
    };
    let applied = system
        .sites
        .create(&OperationContext::default(), &desired)
        .await
        .unwrap();

    assert_eq!(applied.handle.as_str(), SITE);
    assert!(!applied.observed.publish);
    mock.verify();
}

/// Cancelling while the publish backs off must not read as success: the error carries the
/// handle of the site that now exists.
#[tokio::test(start_paused = true)]
async fn test_site_publish_cancelled_after_create_reports_handle() {
    let mock = MockTransport::new();
    mock.expect(Method::POST, "/v2/workspaces/ws-1/sites")
        .respond_json(200, site_record("Marketing", None));
    mock.expect(Method::POST, format!("{SITE_PATH}/publish"))
        .rate_limited(Some(20));
    let system = system(&mock);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let desired = SiteDesired {
        publish: true,
        ..site_desired()
    };
    let err = system
        .sites
        .create(&OperationContext::new(cancel), &desired)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.applied_handle().map(ResourceHandle::as_str), Some(SITE));
    match &err {
        ReconcileError::PartiallyApplied { step, source, .. } => {
            assert_eq!(*step, "publish");
            assert!(matches!(**source, ReconcileError::Cancelled { during: "backoff", .. }));
        }
        other => panic!("expected PartiallyApplied, got {other:?}"),
    }
    assert_eq!(mock.call_count(), 2);
    mock.verify();
}

#[tokio::test]
async fn test_site_unchanged_update_sends_nothing() {
    let mock = MockTransport::new();
    let system = system(&mock);

    let prior = SiteObserved {
        site_id: SITE.into(),
        workspace_id: "ws-1".into(),
        display_name: "Marketing".into(),
        short_name: Some("marketing".into()),
        template_name: Some("blank".into()),
        publish: true,
        last_published: Some("2024-03-01T10:00:00Z".into()),
        ..Default::default()
    };
    let desired = SiteDesired {
        publish: true,
        ..site_desired()
    };
    let handle = ResourceHandle::new(SITE);

    assert!(system.sites.diff(&desired, &prior).is_empty());
    let applied = system
        .sites
        .update(&OperationContext::default(), &handle, &desired, &prior)
        .await
        .unwrap();

    assert_eq!(applied.handle, handle);
    assert_eq!(applied.observed, prior);
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_site_update_patches_full_payload() {
    let mock = MockTransport::new();
    mock.expect(Method::GET, SITE_PATH)
        .respond_json(200, site_record("Marketing", Some("2024-03-01T10:00:00Z")));
    mock.expect(Method::PATCH, SITE_PATH)
        .respond_json(200, site_record("Marketing EU", Some("2024-03-01T10:00:00Z")));
    let system = system(&mock);
    let ctx = OperationContext::default();
    let handle = ResourceHandle::new(SITE);

    let prior = system
        .sites
        .read(&ctx, &handle)
        .await
        .unwrap()
        .into_option()
        .unwrap();
    assert!(prior.publish);
    assert_eq!(prior.workspace_id, "ws-1");

    let desired = SiteDesired {
        display_name: "Marketing EU".into(),
        parent_folder_id: Some("folder-9".into()),
        ..site_desired()
    };
    let diff = system.sites.diff(&desired, &prior);
    assert_eq!(diff.fields(), vec!["displayName", "parentFolderId"]);

    let applied = system.sites.update(&ctx, &handle, &desired, &prior).await.unwrap();
    assert_eq!(applied.handle, handle);
    assert_eq!(applied.observed.display_name, "Marketing EU");
    assert_eq!(
        mock.calls()[1].body.clone().unwrap(),
        json!({"name": "Marketing EU", "parentFolderId": "folder-9"})
    );
    mock.verify();
}

#[tokio::test]
async fn test_site_workspace_move_replaces() {
    let mock = MockTransport::new();
    mock.expect(Method::DELETE, SITE_PATH).respond(204, "");
    mock.expect(Method::POST, "/v2/workspaces/ws-2/sites")
        .respond_json(200, json!({"id": "aaaaaaaaaaaaaaaaaaaaaaaa", "workspaceId": "ws-2", "displayName": "Marketing"}));
    let system = system(&mock);

    let observed = SiteObserved {
        site_id: SITE.into(),
        workspace_id: "ws-1".into(),
        display_name: "Marketing".into(),
        ..Default::default()
    };
    let desired = SiteDesired {
        workspace_id: "ws-2".into(),
        ..site_desired()
    };
    let applied = system
        .sites
        .update(&OperationContext::default(), &ResourceHandle::new(SITE), &desired, &observed)
        .await
        .unwrap();

    assert_eq!(applied.handle.as_str(), "aaaaaaaaaaaaaaaaaaaaaaaa");
    assert_eq!(applied.observed.workspace_id, "ws-2");
    mock.verify();
}

// =============================================================================
// Retry and cancellation through a reconciler
// =============================================================================

/// Three rate-limited answers are absorbed; the fourth attempt succeeds.
#[tokio::test(start_paused = true)]
async fn test_rate_limits_absorbed() {
    let mock = MockTransport::new();
    for _ in 0..3 {
        mock.expect(Method::PUT, ROBOTS_PATH).rate_limited(None);
    }
    mock.expect(Method::PUT, ROBOTS_PATH).echo(200);
    let system = system(&mock);

    let applied = system
        .robots_txt
        .create(
            &OperationContext::default(),
            &RobotsTxtDesired::new(SITE, "User-agent: *\nAllow: /"),
        )
        .await
        .unwrap();

    assert_eq!(applied.observed.content, "User-agent: *\nAllow: /");
    assert_eq!(mock.call_count(), 4);
    mock.verify();
}

/// A hint longer than the policy's `max_delay` is still waited out before the next attempt.
#[tokio::test(start_paused = true)]
async fn test_long_retry_after_is_waited_in_full() {
    let mock = MockTransport::new();
    mock.expect(Method::PUT, ROBOTS_PATH).rate_limited(Some(60));
    mock.expect(Method::PUT, ROBOTS_PATH).echo(200);
    let system = system(&mock);

    let start = tokio::time::Instant::now();
    system
        .robots_txt
        .create(
            &OperationContext::default(),
            &RobotsTxtDesired::new(SITE, "User-agent: *\nAllow: /"),
        )
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_secs(60));
    assert_eq!(mock.call_count(), 2);
    mock.verify();
}

#[tokio::test(start_paused = true)]
async fn test_rate_limits_exhaust_budget() {
    let mock = MockTransport::new();
    for _ in 0..4 {
        mock.expect(Method::GET, SITE_PATH).rate_limited(Some(2));
    }
    let system = system(&mock);

    let err = system
        .sites
        .read(&OperationContext::default(), &ResourceHandle::new(SITE))
        .await
        .unwrap_err();

    match err {
        ReconcileError::MaxRetriesExceeded {
            attempts,
            last_status,
            waited,
            ..
        } => {
            assert_eq!(attempts, 4);
            assert_eq!(last_status, Some(429));
            assert_eq!(waited, Duration::from_secs(6));
        }
        other => panic!("expected MaxRetriesExceeded, got {other:?}"),
    }
    mock.verify();
}

#[tokio::test(start_paused = true)]
async fn test_network_errors_are_retried() {
    let mock = MockTransport::new();
    mock.expect(Method::GET, REDIRECTS_PATH)
        .network_error("connection reset");
    mock.expect(Method::GET, REDIRECTS_PATH)
        .respond_json(200, json!({"redirects": [redirect_rule("r1", "/old", "/new", 301)]}));
    let system = system(&mock);

    let observed = system
        .redirects
        .read(
            &OperationContext::default(),
            &ResourceHandle::new(format!("{SITE}/redirects/r1")),
        )
        .await
        .unwrap()
        .into_option()
        .unwrap();
    assert_eq!(observed.destination_path, "/new");
}

#[tokio::test]
async fn test_cancelled_before_request() {
    let mock = MockTransport::new();
    let system = system(&mock);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = system
        .robots_txt
        .delete(
            &OperationContext::new(cancel),
            &ResourceHandle::new(format!("{SITE}/robots.txt")),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Cancelled { during: "request", .. }));
}

#[tokio::test]
async fn test_shutdown_cancels_contexts() {
    let mock = MockTransport::new();
    let system = system(&mock);
    let ctx = system.context();
    system.shutdown();

    let err = system
        .sites
        .read(&ctx, &ResourceHandle::new(SITE))
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

// =============================================================================
// Kind-tagged dispatch
// =============================================================================

#[tokio::test]
async fn test_read_any_dispatches_on_handle() {
    let mock = MockTransport::new();
    mock.expect(Method::GET, ROBOTS_PATH).not_found();
    mock.expect(Method::GET, SITE_PATH)
        .respond_json(200, site_record("Marketing", None));
    let system = system(&mock);
    let ctx = OperationContext::default();

    let robots = system
        .read_any(&ctx, &ResourceHandle::new(format!("{SITE}/robots.txt")))
        .await
        .unwrap();
    assert_eq!(robots, Observation::Absent);

    let site = system
        .read_any(&ctx, &ResourceHandle::new(SITE))
        .await
        .unwrap();
    match site {
        Observation::Present(ObservedResource::Site(site)) => {
            assert_eq!(site.display_name, "Marketing");
            assert!(!site.publish);
        }
        other => panic!("expected a site, got {other:?}"),
    }

    let err = system
        .read_any(&ctx, &ResourceHandle::new(format!("{SITE}/webhooks/w1")))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::MalformedHandle { .. }));
    mock.verify();
}

#[tokio::test]
async fn test_update_any_rejects_kind_mismatch() {
    let mock = MockTransport::new();
    let system = system(&mock);

    let err = system
        .update_any(
            &OperationContext::default(),
            &ResourceHandle::new(format!("{SITE}/redirects/r1")),
            &DesiredResource::Site(site_desired()),
            &ObservedResource::Redirect(existing_redirect()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Conflict { .. }));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_create_any_and_diff_any() {
    let mock = MockTransport::new();
    mock.expect(Method::PUT, ROBOTS_PATH).echo(200);
    let system = system(&mock);

    let desired = DesiredResource::RobotsTxt(RobotsTxtDesired::new(SITE, "User-agent: *\nAllow: /"));
    let applied = system
        .create_any(&OperationContext::default(), &desired)
        .await
        .unwrap();

    let diff = system
        .diff_any(&applied.handle, &desired, &applied.observed)
        .unwrap();
    assert!(diff.is_empty());
}
