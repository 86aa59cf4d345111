//! Kind-tagged records for the orchestration boundary.
//!
//! The orchestration layer persists only handles and hands over untyped declarations. These
//! enums carry a record of any managed kind, and [`kind_of_handle`] recovers the kind from a
//! handle's grammar.

use crate::domain::{
    RedirectDesired, RedirectObserved, RobotsTxtDesired, RobotsTxtObserved, SiteDesired,
    SiteObserved,
};
use crate::framework::ResourceHandle;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKindTag {
    Site,
    Redirect,
    RobotsTxt,
}

impl fmt::Display for ResourceKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Site => "site",
            Self::Redirect => "redirect",
            Self::RobotsTxt => "robots.txt",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DesiredResource {
    Site(SiteDesired),
    Redirect(RedirectDesired),
    RobotsTxt(RobotsTxtDesired),
}

impl DesiredResource {
    pub fn kind(&self) -> ResourceKindTag {
        match self {
            Self::Site(_) => ResourceKindTag::Site,
            Self::Redirect(_) => ResourceKindTag::Redirect,
            Self::RobotsTxt(_) => ResourceKindTag::RobotsTxt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ObservedResource {
    Site(SiteObserved),
    Redirect(RedirectObserved),
    RobotsTxt(RobotsTxtObserved),
}

impl ObservedResource {
    pub fn kind(&self) -> ResourceKindTag {
        match self {
            Self::Site(_) => ResourceKindTag::Site,
            Self::Redirect(_) => ResourceKindTag::Redirect,
            Self::RobotsTxt(_) => ResourceKindTag::RobotsTxt,
        }
    }
}

/// The kind whose handle grammar accepts `handle`, if any.
pub fn kind_of_handle(handle: &ResourceHandle) -> Option<ResourceKindTag> {
    if crate::redirect::entity::GRAMMAR.matches(handle) {
        Some(ResourceKindTag::Redirect)
    } else if crate::robots_txt::entity::GRAMMAR.matches(handle) {
        Some(ResourceKindTag::RobotsTxt)
    } else if crate::site::entity::GRAMMAR.matches(handle) {
        Some(ResourceKindTag::Site)
    } else {
        None
    }
}
