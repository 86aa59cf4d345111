//! Pre-flight field checks.
//!
//! Every rule is pure and synchronous and returns `Option<FieldError>`. A [`Validator`] runs a
//! list of them and keeps every failure, so one pass reports all problems with a declaration
//! instead of the first one.

use crate::framework::error::{FieldError, ReconcileError};
use regex::Regex;
use std::fmt::Display;

/// Collects the failures of a set of rules.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, outcome: Option<FieldError>) -> &mut Self {
        if let Some(error) = outcome {
            self.errors.push(error);
        }
        self
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }
}

/// Converts collected field errors into the pre-flight failure for `resource`.
pub fn ensure_valid(resource: &'static str, errors: Vec<FieldError>) -> Result<(), ReconcileError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ReconcileError::Validation { resource, errors })
    }
}

pub fn non_empty(field: &'static str, value: &str, expected: &str, remedy: &str) -> Option<FieldError> {
    value
        .trim()
        .is_empty()
        .then(|| FieldError::new(field, value, format!("a non-empty value ({expected})"), remedy))
}

pub fn max_chars(field: &'static str, value: &str, max: usize, remedy: &str) -> Option<FieldError> {
    (value.chars().count() > max).then(|| {
        FieldError::new(field, value, format!("at most {max} characters"), remedy)
    })
}

/// Fails when `value` does not match `pattern`. Empty values are left to [`non_empty`].
pub fn matches(
    field: &'static str,
    value: &str,
    pattern: &Regex,
    expected: &str,
    remedy: &str,
) -> Option<FieldError> {
    (!value.is_empty() && !pattern.is_match(value))
        .then(|| FieldError::new(field, value, expected, remedy))
}

pub fn one_of<T: PartialEq + Display>(
    field: &'static str,
    value: &T,
    allowed: &[T],
    remedy: &str,
) -> Option<FieldError> {
    if allowed.contains(value) {
        return None;
    }
    let expected = allowed
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" or ");
    Some(FieldError::new(field, value.to_string(), expected, remedy))
}
