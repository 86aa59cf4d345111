//! Change detection between declared and observed state.
//!
//! A [`DiffSet`] collects every changed field. Recording the same field twice keeps the stronger
//! classification, so a field is never both [`ChangeKind::Update`] and [`ChangeKind::Replace`].

use serde::Serialize;
use std::collections::BTreeMap;

/// How a changed field must be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    /// Mutated in place.
    Update,
    /// Requires deleting and recreating the remote resource.
    Replace,
}

/// One changed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDiff {
    pub field: &'static str,
    pub change: ChangeKind,
}

/// Every change found between a desired and an observed state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSet {
    changes: BTreeMap<&'static str, ChangeKind>,
    requires_replace: bool,
}

impl DiffSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a change; `Replace` wins over `Update` for the same field.
    pub fn record(&mut self, field: &'static str, change: ChangeKind) {
        let entry = self.changes.entry(field).or_insert(change);
        *entry = (*entry).max(change);
        if change == ChangeKind::Replace {
            self.requires_replace = true;
        }
    }

    /// Records `field` only when `desired != observed`.
    pub fn compare<T: PartialEq + ?Sized>(
        &mut self,
        field: &'static str,
        desired: &T,
        observed: &T,
        change: ChangeKind,
    ) {
        if desired != observed {
            self.record(field, change);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn requires_replace(&self) -> bool {
        self.requires_replace
    }

    pub fn get(&self, field: &str) -> Option<ChangeKind> {
        self.changes.get(field).copied()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.changes.contains_key(field)
    }

    /// Changed fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = PropertyDiff> + '_ {
        self.changes
            .iter()
            .map(|(field, change)| PropertyDiff {
                field: *field,
                change: *change,
            })
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.changes.keys().copied().collect()
    }
}
