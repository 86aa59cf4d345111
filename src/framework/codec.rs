//! # Resource Handles
//!
//! A [`ResourceHandle`] is the only identifier the orchestration layer persists for a remote
//! resource, so its grammar is a compatibility contract: changing it breaks every stored handle.
//!
//! Each resource kind declares a [`HandleGrammar`] made of identifier and literal segments:
//!
//! | Kind      | Grammar                              |
//! |-----------|--------------------------------------|
//! | Site      | `{siteId}`                           |
//! | Redirect  | `{siteId}/redirects/{redirectId}`    |
//! | RobotsTxt | `{siteId}/robots.txt`                |
//!
//! Encoding and decoding are pure. Identifiers are never empty and never contain `/`, which
//! makes `decode(encode(ids)) == ids` hold for every accepted input.

use crate::framework::error::ReconcileError;
use serde::{Deserialize, Serialize};
use std::fmt;

const SEPARATOR: char = '/';

/// Opaque, persisted identity of one remote resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceHandle(String);

impl ResourceHandle {
    /// Wraps a previously persisted handle. Nothing is checked until it is decoded.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One slash-delimited piece of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// A remote identifier, named for error messages.
    Id(&'static str),
    /// A fixed kind marker such as `redirects`.
    Literal(&'static str),
}

/// The fixed handle layout owned by one resource kind.
#[derive(Debug, Clone, Copy)]
pub struct HandleGrammar {
    resource: &'static str,
    segments: &'static [Segment],
}

impl HandleGrammar {
    pub const fn new(resource: &'static str, segments: &'static [Segment]) -> Self {
        Self { resource, segments }
    }

    /// Human-readable layout, e.g. `{siteId}/redirects/{redirectId}`.
    pub fn layout(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Id(name) => format!("{{{name}}}"),
                Segment::Literal(text) => (*text).to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    fn id_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Id(_)))
            .count()
    }

    fn malformed(&self, handle: impl Into<String>) -> ReconcileError {
        ReconcileError::MalformedHandle {
            resource: self.resource,
            handle: handle.into(),
            expected: format!(
                "'{}' where every identifier is non-empty and contains no '/'",
                self.layout()
            ),
        }
    }

    /// Builds a handle from the identifier segments, in grammar order.
    pub fn encode(&self, ids: &[&str]) -> Result<ResourceHandle, ReconcileError> {
        if ids.len() != self.id_count() {
            return Err(self.malformed(ids.join("/")));
        }

        let mut ids = ids.iter();
        let mut parts = Vec::with_capacity(self.segments.len());
        for segment in self.segments {
            match segment {
                Segment::Literal(text) => parts.push(*text),
                Segment::Id(_) => {
                    // Length was checked above.
                    let Some(&id) = ids.next() else {
                        return Err(self.malformed(parts.join("/")));
                    };
                    if id.is_empty() || id.contains(SEPARATOR) {
                        parts.push(id);
                        return Err(self.malformed(parts.join("/")));
                    }
                    parts.push(id);
                }
            }
        }
        Ok(ResourceHandle(parts.join("/")))
    }

    /// Splits a handle back into its identifier segments, in grammar order.
    pub fn decode(&self, handle: &ResourceHandle) -> Result<Vec<String>, ReconcileError> {
        let raw = handle.as_str();
        let pieces: Vec<&str> = raw.split(SEPARATOR).collect();
        if pieces.len() != self.segments.len() {
            return Err(self.malformed(raw));
        }

        let mut ids = Vec::with_capacity(self.id_count());
        for (piece, segment) in pieces.iter().zip(self.segments) {
            match segment {
                Segment::Literal(text) if piece != text => return Err(self.malformed(raw)),
                Segment::Literal(_) => {}
                Segment::Id(_) if piece.is_empty() => return Err(self.malformed(raw)),
                Segment::Id(_) => ids.push((*piece).to_string()),
            }
        }
        Ok(ids)
    }

    /// Whether `handle` decodes under this grammar.
    pub fn matches(&self, handle: &ResourceHandle) -> bool {
        self.decode(handle).is_ok()
    }
}
