//! Request routing dispatch module
//!
//! Entry point for HTTP request processing. The [`Router`] is a plain value
//! built at startup and stored in [`AppState`]; there is no global route
//! registration.

use crate::config::{AppState, Config};
use crate::handler::static_files::StaticRoot;
use crate::handler::validate;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::validation::RuleSet;
use http_body_util::Full;
use hyper::body::{Body as _, Bytes};
use hyper::header::{HeaderValue, SERVER};
use hyper::{HeaderMap, Method, Request, Response};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Path of the validation endpoint in the full server
pub const VALIDATE_PATH: &str = "/validate";

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_none_match: Option<&'a str>,
}

impl<'a> RequestContext<'a> {
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        let method = req.method();
        Self {
            method,
            path: req.uri().path(),
            query: req.uri().query(),
            is_head: *method == Method::HEAD,
            if_none_match: header_str(req.headers(), "if-none-match"),
        }
    }
}

/// Handler bound to an exact path
#[derive(Debug, Clone)]
pub enum Endpoint {
    /// `GET ?field=..&value=..` checked against a rule table
    Validate(RuleSet),
}

/// Exact-path routes with an optional static fallback
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: HashMap<String, Endpoint>,
    fallback: Option<StaticRoot>,
    enable_cors: bool,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Static files plus `/validate` with the built-in rules
    pub fn full(config: &Config) -> Self {
        Self::static_only(config)
            .route(VALIDATE_PATH, Endpoint::Validate(RuleSet::with_defaults()))
    }

    /// Static files only
    pub fn static_only(config: &Config) -> Self {
        Self::new()
            .fallback(StaticRoot::from_config(&config.static_files))
            .cors(config.http.enable_cors)
    }

    #[must_use]
    pub fn route(mut self, path: impl Into<String>, endpoint: Endpoint) -> Self {
        self.routes.insert(path.into(), endpoint);
        self
    }

    #[must_use]
    pub fn fallback(mut self, root: StaticRoot) -> Self {
        self.fallback = Some(root);
        self
    }

    #[must_use]
    pub fn cors(mut self, enable: bool) -> Self {
        self.enable_cors = enable;
        self
    }

    /// Whether an exact route is registered for `path`
    pub fn has_route(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }

    /// Dispatch to the exact route, else the static fallback, else 404
    pub async fn dispatch(&self, ctx: &RequestContext<'_>) -> Response<Full<Bytes>> {
        if let Some(endpoint) = self.routes.get(ctx.path) {
            return match endpoint {
                Endpoint::Validate(rules) => validate::handle_validate(ctx, rules),
            };
        }

        let Some(root) = &self.fallback else {
            return http::build_404_response();
        };

        if let Some(resp) = check_static_method(ctx.method, self.enable_cors) {
            return resp;
        }
        root.serve(ctx).await
    }
}

/// Main entry point for HTTP request handling
///
/// Generic over the body type: no handler reads the request body.
pub async fn handle_request<B>(
    req: Request<B>,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let ctx = RequestContext::from_request(&req);

    let mut response = match check_body_size(req.headers(), state.config.http.max_body_size) {
        Some(resp) => resp,
        None => state.router.dispatch(&ctx).await,
    };

    if let Ok(value) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, value);
    }

    if state.access_log_enabled() {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            ctx.method.to_string(),
            ctx.path.to_string(),
        );
        entry.query = ctx.query.map(ToString::to_string);
        entry.http_version = format_version(req.version());
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or_default();
        entry.referer = header_str(req.headers(), "referer").map(ToString::to_string);
        entry.user_agent = header_str(req.headers(), "user-agent").map(ToString::to_string);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

const STATIC_ALLOW: &str = "GET, HEAD, OPTIONS";

/// Static files accept GET and HEAD; OPTIONS answers with the allowed set
fn check_static_method(method: &Method, enable_cors: bool) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response(STATIC_ALLOW, enable_cors)),
        _ => {
            logger::log_debug(&format!("Method not allowed for static files: {method}"));
            Some(http::build_405_response(STATIC_ALLOW))
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let size_str = header_str(headers, "content-length")?;
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Some(http::build_413_response())
        }
        Err(_) => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: '{size_str}', skipping size check"
            ));
            None
        }
        _ => None,
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn format_version(version: hyper::Version) -> String {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::StatusCode;

    fn state_for(root: &std::path::Path, full: bool) -> Arc<AppState> {
        let mut config = Config::defaults().unwrap();
        config.static_files.root = root.to_string_lossy().into_owned();
        let router = if full {
            Router::full(&config)
        } else {
            Router::static_only(&config)
        };
        Arc::new(AppState::new(config, router))
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    async fn send(state: &Arc<AppState>, req: Request<()>) -> (StatusCode, HeaderMap, String) {
        let resp = handle_request(req, peer(), Arc::clone(state)).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get(uri: &str) -> Request<()> {
        Request::builder().uri(uri).body(()).unwrap()
    }

    fn static_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>form</h1>").unwrap();
        std::fs::write(dir.path().join("main.js"), "console.log(1);").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_full_router_validates() {
        let dir = static_dir();
        let state = state_for(dir.path(), true);

        let (status, headers, body) =
            send(&state, get("/validate?field=last-name&value=Bloggs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(body, r#"{"valid":true,"message":"OK"}"#);

        let (status, _, body) =
            send(&state, get("/validate?field=last-name&value=bloggs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"valid":false,"message":"Enter 'Bloggs'"}"#);
    }

    #[tokio::test]
    async fn test_full_router_serves_static_fallback() {
        let dir = static_dir();
        let state = state_for(dir.path(), true);

        let (status, _, body) = send(&state, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>form</h1>");

        let (status, headers, _) = send(&state, get("/main.js")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["content-type"], "text/javascript; charset=utf-8");
    }

    #[tokio::test]
    async fn test_static_only_router_has_no_validate_route() {
        let dir = static_dir();
        let state = state_for(dir.path(), false);
        assert!(!state.router.has_route(VALIDATE_PATH));

        let (status, _, body) =
            send(&state, get("/validate?field=last-name&value=Bloggs")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "404 Not Found");

        let (status, _, _) = send(&state, get("/")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_server_header_set() {
        let dir = static_dir();
        let state = state_for(dir.path(), true);
        let (_, headers, _) = send(&state, get("/")).await;
        assert_eq!(headers["server"], "form-validate/0.1");
    }

    #[tokio::test]
    async fn test_static_rejects_post() {
        let dir = static_dir();
        let state = state_for(dir.path(), true);
        let req = Request::builder().method(Method::POST).uri("/").body(()).unwrap();
        let (status, headers, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(headers["allow"], STATIC_ALLOW);
    }

    #[tokio::test]
    async fn test_static_options() {
        let dir = static_dir();
        let state = state_for(dir.path(), true);
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/index.html")
            .body(())
            .unwrap();
        let (status, headers, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(headers["allow"], STATIC_ALLOW);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let dir = static_dir();
        let state = state_for(dir.path(), true);
        let req = Request::builder()
            .uri("/validate?field=a&value=b")
            .header("content-length", "999999999")
            .body(())
            .unwrap();
        let (status, _, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_empty_router_returns_404() {
        let router = Router::new();
        let req = get("/anything");
        let ctx = RequestContext::from_request(&req);
        let resp = router.dispatch(&ctx).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_format_version() {
        assert_eq!(format_version(hyper::Version::HTTP_11), "1.1");
        assert_eq!(format_version(hyper::Version::HTTP_10), "1.0");
        assert_eq!(format_version(hyper::Version::HTTP_2), "2");
    }
}
