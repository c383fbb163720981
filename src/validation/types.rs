//! Validation request/response types

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

const FIELD_PARAM: &str = "field";
const VALUE_PARAM: &str = "value";

/// A single field to validate, taken from the query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequest {
    pub field: String,
    pub value: String,
}

impl ValidationRequest {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Parse `field` and `value` from a raw query string
    ///
    /// Values are percent-decoded. When a key repeats, the first occurrence
    /// wins. Pairs containing `;` or a broken `%` escape are dropped, and
    /// absent and empty parameters are both treated as missing.
    pub fn from_query(query: Option<&str>) -> Result<Self, ValidationError> {
        let pairs: Vec<(String, String)> = query
            .map(well_formed_pairs)
            .and_then(|q| serde_urlencoded::from_str(&q).ok())
            .unwrap_or_default();

        let field = first_value(&pairs, FIELD_PARAM);
        if field.is_empty() {
            return Err(ValidationError::MissingParameter(FIELD_PARAM));
        }
        let value = first_value(&pairs, VALUE_PARAM);
        if value.is_empty() {
            return Err(ValidationError::MissingParameter(VALUE_PARAM));
        }

        Ok(Self::new(field, value))
    }
}

/// Keep only the `&`-separated pairs a strict query parser accepts
///
/// A pair is dropped if it contains `;` or a `%` not followed by two hex
/// digits, so `value=%zz` reads as an absent `value`.
fn well_formed_pairs(query: &str) -> String {
    query
        .split('&')
        .filter(|pair| !pair.is_empty() && !pair.contains(';') && escapes_valid(pair))
        .collect::<Vec<_>>()
        .join("&")
}

fn escapes_valid(pair: &str) -> bool {
    let bytes = pair.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3);
            if !hex.is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit)) {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> &'a str {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map_or("", |(_, v)| v.as_str())
}

/// Verdict returned to the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub message: String,
}

impl ValidationResponse {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: "OK".to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }

    /// Serialize to compact JSON
    pub fn to_json(&self) -> Result<String, ValidationError> {
        serde_json::to_string(self).map_err(ValidationError::Serialization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_query() {
        let req = ValidationRequest::from_query(Some("field=last-name&value=Bloggs")).unwrap();
        assert_eq!(req, ValidationRequest::new("last-name", "Bloggs"));
    }

    #[test]
    fn test_from_query_decodes_values() {
        let req = ValidationRequest::from_query(Some("field=first%20name&value=Jo+Ann")).unwrap();
        assert_eq!(req.field, "first name");
        assert_eq!(req.value, "Jo Ann");
    }

    #[test]
    fn test_from_query_first_value_wins() {
        let req =
            ValidationRequest::from_query(Some("field=last-name&value=Bloggs&value=Smith")).unwrap();
        assert_eq!(req.value, "Bloggs");
    }

    #[test]
    fn test_from_query_missing_params() {
        assert!(matches!(
            ValidationRequest::from_query(None),
            Err(ValidationError::MissingParameter("field"))
        ));
        assert!(matches!(
            ValidationRequest::from_query(Some("value=Bloggs")),
            Err(ValidationError::MissingParameter("field"))
        ));
        assert!(matches!(
            ValidationRequest::from_query(Some("field=last-name")),
            Err(ValidationError::MissingParameter("value"))
        ));
        assert!(matches!(
            ValidationRequest::from_query(Some("field=&value=")),
            Err(ValidationError::MissingParameter("field"))
        ));
        assert!(matches!(
            ValidationRequest::from_query(Some("field=last-name&value=")),
            Err(ValidationError::MissingParameter("value"))
        ));
    }

    #[test]
    fn test_from_query_drops_malformed_pairs() {
        assert!(matches!(
            ValidationRequest::from_query(Some("field=last-name&value=%zz")),
            Err(ValidationError::MissingParameter("value"))
        ));
        assert!(matches!(
            ValidationRequest::from_query(Some("field=last-name;x=1&value=Bloggs")),
            Err(ValidationError::MissingParameter("field"))
        ));
        assert!(matches!(
            ValidationRequest::from_query(Some("field=last-name&value=Blo%2")),
            Err(ValidationError::MissingParameter("value"))
        ));

        // A later well-formed duplicate still counts
        let req =
            ValidationRequest::from_query(Some("value=%zz&field=last-name&value=Bloggs")).unwrap();
        assert_eq!(req.value, "Bloggs");
    }

    #[test]
    fn test_well_formed_pairs() {
        assert_eq!(well_formed_pairs("a=1&&b=%41"), "a=1&b=%41");
        assert_eq!(well_formed_pairs("a=1;b=2&c=3"), "c=3");
        assert_eq!(well_formed_pairs("a=%&b=%4g"), "");
    }

    #[test]
    fn test_response_json_shape() {
        assert_eq!(
            ValidationResponse::ok().to_json().unwrap(),
            r#"{"valid":true,"message":"OK"}"#
        );
        assert_eq!(
            ValidationResponse::invalid("Enter 'Bloggs'").to_json().unwrap(),
            r#"{"valid":false,"message":"Enter 'Bloggs'"}"#
        );
    }
}
