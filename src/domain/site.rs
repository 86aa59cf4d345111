//! Site records.
//!
//! The API takes `name` on create and update but returns `displayName`; `shortName` and
//! `timeZone` are derived remotely and cannot be set.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared Webflow site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDesired {
    pub workspace_id: String,
    pub display_name: String,
    /// Checked for format only; the remote derives the real value from the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_folder_id: Option<String>,
    /// Only used when the site is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    /// Publish after every successful create or update.
    #[serde(default)]
    pub publish: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteObserved {
    pub site_id: String,
    pub workspace_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    /// Whether the site has been published at least once.
    #[serde(default)]
    pub publish: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_published: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_domains: Vec<String>,
    #[serde(default)]
    pub data_collection_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_collection_type: Option<String>,
}

/// A site as the API returns it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRecord {
    pub id: String,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub last_published: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub parent_folder_id: Option<String>,
    /// Either plain strings or `{ "url": ... }` objects depending on API revision.
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub custom_domains: Vec<Value>,
    #[serde(default)]
    pub data_collection_enabled: bool,
    #[serde(default)]
    pub data_collection_type: Option<String>,
}

impl SiteRecord {
    pub fn domain_urls(&self) -> Vec<String> {
        self.custom_domains
            .iter()
            .filter_map(|domain| match domain {
                Value::String(url) => Some(url.clone()),
                Value::Object(fields) => fields
                    .get("url")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .collect()
    }
}

/// Body of `POST /v2/workspaces/{ws}/sites`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteCreateRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_folder_id: Option<String>,
}

/// Body of `PATCH /v2/sites/{id}`: the full mutable payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteUpdateRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_folder_id: Option<String>,
}

/// Body of `POST /v2/sites/{id}/publish`. No domains means all configured domains.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SitePublishRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,
}
