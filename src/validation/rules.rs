//! Validation rule table
//!
//! A rule is a plain function from the submitted value to a verdict.
//! Adding a rule means registering another function under its field name;
//! dispatch in [`RuleSet::validate`] stays the same.

use std::collections::HashMap;

use super::types::{ValidationRequest, ValidationResponse};

/// Field checked by the built-in rule
pub const LAST_NAME_FIELD: &str = "last-name";

const EXPECTED_LAST_NAME: &str = "Bloggs";

/// Pure validation function for one field
pub type Rule = fn(&str) -> ValidationResponse;

/// Fallback for fields without a rule. Always valid.
pub fn accept_any(_value: &str) -> ValidationResponse {
    ValidationResponse::ok()
}

/// `last-name` must be exactly `Bloggs` (case-sensitive)
pub fn last_name(value: &str) -> ValidationResponse {
    if value == EXPECTED_LAST_NAME {
        ValidationResponse::ok()
    } else {
        ValidationResponse::invalid(format!("Enter '{EXPECTED_LAST_NAME}'"))
    }
}

/// Mapping from field name to rule
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: HashMap<String, Rule>,
}

impl RuleSet {
    /// Empty table; every field falls through to [`accept_any`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in rules registered
    pub fn with_defaults() -> Self {
        Self::new().with_rule(LAST_NAME_FIELD, last_name)
    }

    /// Register (or replace) the rule for `field`
    #[must_use]
    pub fn with_rule(mut self, field: impl Into<String>, rule: Rule) -> Self {
        self.rules.insert(field.into(), rule);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule applied to `field`
    pub fn rule_for(&self, field: &str) -> Rule {
        self.rules.get(field).copied().unwrap_or(accept_any)
    }

    pub fn validate(&self, request: &ValidationRequest) -> ValidationResponse {
        (self.rule_for(&request.field))(&request.value)
    }
}
