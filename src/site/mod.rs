//! Webflow sites.

pub mod entity;

pub use entity::{Site, SiteId};

use crate::framework::{ApiClient, Reconciler};

/// Creates the site reconciler.
pub fn new(api: ApiClient) -> Reconciler<Site> {
    Reconciler::new(Site, api)
}
