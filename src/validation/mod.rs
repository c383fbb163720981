//! Field validation module
//!
//! Turns a `field`/`value` query pair into a `{valid, message}` verdict.
//! Rules are looked up by field name in a [`RuleSet`]; fields without a
//! registered rule are always valid.

mod error;
mod rules;
mod types;

pub use error::ValidationError;
pub use rules::{accept_any, last_name, Rule, RuleSet, LAST_NAME_FIELD};
pub use types::{ValidationRequest, ValidationResponse};
