//! Validation endpoint
//!
//! `GET /validate?field=<name>&value=<input>` answers with
//! `{"valid": bool, "message": string}`.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response, StatusCode};

use crate::handler::router::RequestContext;
use crate::http;
use crate::logger;
use crate::validation::{RuleSet, ValidationError, ValidationRequest};

const VALIDATE_ALLOW: &str = "GET";

/// Handle one request to the validation endpoint
///
/// Non-GET methods get 405 with `Allow: GET`.
pub fn handle_validate(ctx: &RequestContext<'_>, rules: &RuleSet) -> Response<Full<Bytes>> {
    if *ctx.method != Method::GET {
        logger::log_debug(&format!("Method not allowed on {}: {}", ctx.path, ctx.method));
        return http::build_405_response(VALIDATE_ALLOW);
    }

    match validate_query(ctx.query, rules) {
        Ok(json) => http::build_json_response(StatusCode::OK, json),
        Err(e) => error_response(&e),
    }
}

/// Parse the query, apply the rule for its field and encode the verdict
pub fn validate_query(query: Option<&str>, rules: &RuleSet) -> Result<String, ValidationError> {
    let request = ValidationRequest::from_query(query)?;
    rules.validate(&request).to_json()
}

fn error_response(err: &ValidationError) -> Response<Full<Bytes>> {
    match err {
        ValidationError::MissingParameter(_) => {
            logger::log_debug(&format!("Rejected validation request: {err}"));
            http::build_404_response()
        }
        ValidationError::Serialization(_) => {
            logger::log_error(&err.to_string());
            http::build_500_response()
        }
    }
}
