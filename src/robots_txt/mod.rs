//! robots.txt resource logic, including conversion between text and structured rules.

pub mod content;
pub mod entity;

pub use content::{format_content, parse_content};
pub use entity::{RobotsTxt, RobotsTxtId};

use crate::framework::{ApiClient, Reconciler};

/// Creates the robots.txt reconciler.
pub fn new(api: ApiClient) -> Reconciler<RobotsTxt> {
    Reconciler::new(RobotsTxt, api)
}
