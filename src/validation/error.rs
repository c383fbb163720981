//! Validation error type

use std::fmt;

/// Errors raised while handling a validation request
#[derive(Debug)]
pub enum ValidationError {
    /// A required query parameter was absent or empty
    MissingParameter(&'static str),
    /// The verdict could not be encoded as JSON
    Serialization(serde_json::Error),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingParameter(name) => write!(f, "missing query parameter '{name}'"),
            Self::Serialization(e) => write!(f, "failed to serialize response: {e}"),
        }
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MissingParameter(_) => None,
            Self::Serialization(e) => Some(e),
        }
    }
}
