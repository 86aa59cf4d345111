use serde::{Deserialize, Serialize};

/// Declared robots.txt for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotsTxtDesired {
    pub site_id: String,
    /// Traditional robots.txt text.
    pub content: String,
}

impl RobotsTxtDesired {
    pub fn new(site_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotsTxtObserved {
    pub site_id: String,
    pub content: String,
    /// Set when this engine last wrote the file; the API does not report it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

/// One user-agent block as the API represents it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotsTxtRule {
    pub user_agent: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub allows: Vec<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub disallows: Vec<String>,
}

/// Request and response body of `/v2/sites/{site}/robots_txt`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotsTxtBody {
    #[serde(
        default,
        deserialize_with = "super::null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub rules: Vec<RobotsTxtRule>,
    #[serde(
        default,
        deserialize_with = "super::null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub sitemap: String,
}
