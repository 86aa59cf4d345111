//! Conversion between robots.txt text and the API's structured rules.
//!
//! Only `User-agent`, `Allow`, `Disallow` and `Sitemap` are understood; directive names are
//! case-insensitive. `Allow`/`Disallow` lines before the first `User-agent` and unknown lines
//! are dropped, which is why content is compared structurally rather than as text.

use crate::domain::{RobotsTxtBody, RobotsTxtRule};

/// Splits `line` into a directive value when it starts with `name:` (any case).
fn directive<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (key, value) = line.split_once(':')?;
    key.trim()
        .eq_ignore_ascii_case(name)
        .then(|| value.trim())
}

pub fn parse_content(content: &str) -> RobotsTxtBody {
    let mut body = RobotsTxtBody::default();
    let mut current: Option<RobotsTxtRule> = None;

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(sitemap) = directive(line, "sitemap") {
            body.sitemap = sitemap.to_string();
        } else if let Some(agent) = directive(line, "user-agent") {
            body.rules.extend(current.take());
            current = Some(RobotsTxtRule {
                user_agent: agent.to_string(),
                ..RobotsTxtRule::default()
            });
        } else if let Some(rule) = current.as_mut() {
            if let Some(path) = directive(line, "allow").filter(|p| !p.is_empty()) {
                rule.allows.push(path.to_string());
            } else if let Some(path) = directive(line, "disallow").filter(|p| !p.is_empty()) {
                rule.disallows.push(path.to_string());
            }
        }
    }

    body.rules.extend(current);
    body
}

pub fn format_content(body: &RobotsTxtBody) -> String {
    let mut out = String::new();
    for rule in &body.rules {
        out.push_str(&format!("User-agent: {}\n", rule.user_agent));
        for path in &rule.allows {
            out.push_str(&format!("Allow: {path}\n"));
        }
        for path in &rule.disallows {
            out.push_str(&format!("Disallow: {path}\n"));
        }
    }
    if !body.sitemap.is_empty() {
        if !body.rules.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("Sitemap: {}\n", body.sitemap));
    }
    out
}

/// Whether two robots.txt texts mean the same thing to the API.
pub fn same_directives(a: &str, b: &str) -> bool {
    parse_content(a) == parse_content(b)
}
