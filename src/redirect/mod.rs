//! URL redirect rules on a site.

pub mod entity;

pub use entity::{Redirect, RedirectId};

use crate::framework::{ApiClient, Reconciler};

/// Creates the redirect reconciler.
pub fn new(api: ApiClient) -> Reconciler<Redirect> {
    Reconciler::new(Redirect, api)
}
