//! Static file serving module
//!
//! Serves everything below a root directory: index file resolution,
//! directory listings, MIME types and `ETag` revalidation.

use crate::config::StaticFilesConfig;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime, response};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Characters escaped in listing hrefs
const HREF_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`');

/// A directory served at `/`
#[derive(Debug, Clone)]
pub struct StaticRoot {
    root: PathBuf,
    index_files: Vec<String>,
    directory_listing: bool,
}

impl StaticRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index_files: vec!["index.html".to_string()],
            directory_listing: true,
        }
    }

    pub fn from_config(config: &StaticFilesConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root),
            index_files: config.index_files.clone(),
            directory_listing: config.directory_listing,
        }
    }

    /// Serve the file or directory named by the request path
    pub async fn serve(&self, ctx: &RequestContext<'_>) -> Response<Full<Bytes>> {
        let Ok(decoded) = percent_decode_str(ctx.path).decode_utf8() else {
            return http::build_404_response();
        };
        let Some(relative) = sanitize_path(&decoded) else {
            logger::log_warning(&format!("Path traversal attempt blocked: {}", ctx.path));
            return http::build_404_response();
        };

        let root = match fs::canonicalize(&self.root).await {
            Ok(p) => p,
            Err(e) => {
                logger::log_warning(&format!(
                    "Static directory not found or inaccessible '{}': {e}",
                    self.root.display()
                ));
                return http::build_404_response();
            }
        };

        // Not found is the common case, no need to log it
        let Ok(resolved) = fs::canonicalize(root.join(&relative)).await else {
            return http::build_404_response();
        };
        if !resolved.starts_with(&root) {
            logger::log_warning(&format!(
                "Symlink escaping static root blocked: {} -> {}",
                ctx.path,
                resolved.display()
            ));
            return http::build_404_response();
        }

        let Ok(metadata) = fs::metadata(&resolved).await else {
            return http::build_404_response();
        };
        if metadata.is_dir() {
            return self.serve_directory(ctx, &resolved).await;
        }

        serve_file(ctx, &resolved).await
    }

    async fn serve_directory(&self, ctx: &RequestContext<'_>, dir: &Path) -> Response<Full<Bytes>> {
        // Relative links in the index page need the trailing slash
        if !ctx.path.ends_with('/') {
            let location = match ctx.query {
                Some(q) => format!("{}/?{q}", ctx.path),
                None => format!("{}/", ctx.path),
            };
            return http::build_redirect_response(&location);
        }

        for index_file in &self.index_files {
            let index_path = dir.join(index_file);
            if fs::metadata(&index_path).await.is_ok_and(|m| m.is_file()) {
                return serve_file(ctx, &index_path).await;
            }
        }

        if !self.directory_listing {
            return http::build_404_response();
        }

        match list_directory(dir).await {
            Ok(entries) => response::build_html_response(
                render_listing(ctx.path, &entries),
                ctx.is_head,
            ),
            Err(e) => {
                logger::log_error(&format!(
                    "Failed to list directory '{}': {e}",
                    dir.display()
                ));
                http::build_500_response()
            }
        }
    }
}

/// Turn a decoded URL path into a path relative to the root
///
/// Returns `None` if any segment would climb out of the root.
fn sanitize_path(path: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(relative)
}

async fn serve_file(ctx: &RequestContext<'_>, path: &Path) -> Response<Full<Bytes>> {
    let Ok(metadata) = fs::metadata(path).await else {
        return http::build_404_response();
    };
    let etag = cache::generate_etag(metadata.len(), metadata.modified().ok());
    if cache::check_etag_match(ctx.if_none_match, &etag) {
        return http::build_304_response(&etag);
    }

    let content = match fs::read(path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!("Failed to read file '{}': {e}", path.display()));
            return http::build_404_response();
        }
    };

    let content_type = mime::get_content_type(path.extension().and_then(|e| e.to_str()));
    response::build_file_response(Bytes::from(content), content_type, &etag, ctx.is_head)
}

/// Entry names sorted, directories suffixed with `/`
async fn list_directory(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
            name.push('/');
        }
        entries.push(name);
    }
    entries.sort();
    Ok(entries)
}

fn render_listing(request_path: &str, entries: &[String]) -> String {
    let title = html_escape::encode_text(request_path);
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Index of {title}</title>\n</head>\n<body>\n<h1>Index of {title}</h1>\n<pre>\n"
    );
    for name in entries {
        let _ = writeln!(
            html,
            "<a href=\"{}\">{}</a>",
            utf8_percent_encode(name, HREF_ESCAPE),
            html_escape::encode_text(name)
        );
    }
    html.push_str("</pre>\n</body>\n</html>\n");
    html
}
