//! Typed records exchanged with the orchestration layer and the Webflow API.
//!
//! Each kind has a `*Desired` record (declared configuration), an `*Observed` record (declared
//! fields plus remote-computed ones) and the wire DTOs used on the API.

pub mod redirect;
pub mod robots_txt;
pub mod site;

pub use redirect::*;
pub use robots_txt::*;
pub use site::*;

use crate::framework::FieldError;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::sync::LazyLock;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Prefix of placeholder ids handed to dependent resources during a dry run.
pub const PREVIEW_PREFIX: &str = "preview-";

static SITE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-f0-9]{24}$").expect("site id pattern compiles"));

/// Checks a Webflow site id: 24 lowercase hex characters, or a dry-run placeholder when
/// `allow_placeholder` is set.
pub fn check_site_id(field: &'static str, value: &str, allow_placeholder: bool) -> Option<FieldError> {
    const EXPECTED: &str =
        "a 24-character lowercase hexadecimal string (e.g. '5f0c8c9e1c9d440000e8d8c3')";
    if value.is_empty() {
        return Some(FieldError::new(
            field,
            value,
            EXPECTED,
            "provide the site id shown in the Webflow dashboard under Site Settings",
        ));
    }
    if value.starts_with(PREVIEW_PREFIX) {
        return (!allow_placeholder).then(|| {
            FieldError::new(
                field,
                value,
                EXPECTED,
                "this placeholder only exists in a dry run; apply the site first and reference its real id",
            )
        });
    }
    if SITE_ID.is_match(value) {
        return None;
    }
    Some(FieldError::new(
        field,
        value,
        EXPECTED,
        "check the site id in the Webflow dashboard; it contains only digits and the letters a-f",
    ))
}

/// Treats an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A placeholder id for dry-run results.
pub fn preview_id() -> String {
    format!("{PREVIEW_PREFIX}{}", OffsetDateTime::now_utc().unix_timestamp())
}

/// Current time as RFC 3339, for remote-computed timestamps the API does not echo.
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
