use serde::{Deserialize, Serialize};

/// Declared URL redirect rule on a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectDesired {
    pub site_id: String,
    pub source_path: String,
    pub destination_path: String,
    /// 301 (permanent) or 302 (temporary).
    pub status_code: u16,
}

impl RedirectDesired {
    pub fn new(
        site_id: impl Into<String>,
        source_path: impl Into<String>,
        destination_path: impl Into<String>,
        status_code: u16,
    ) -> Self {
        Self {
            site_id: site_id.into(),
            source_path: source_path.into(),
            destination_path: destination_path.into(),
            status_code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectObserved {
    pub site_id: String,
    pub redirect_id: String,
    pub source_path: String,
    pub destination_path: String,
    /// 0 when the API omitted it.
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
}

/// A redirect as the API represents it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectRule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "fromUrl")]
    pub source_path: String,
    #[serde(rename = "toUrl")]
    pub destination_path: String,
    #[serde(default)]
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
}

/// Response of `GET /v2/sites/{site}/redirects`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedirectList {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub redirects: Vec<RedirectRule>,
}
