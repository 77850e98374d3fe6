//! Static asset resolution and the SPA shell fallback.
//!
//! Consulted only after the route table reports no match, and only for
//! GET/HEAD. A request path that resolves to a file inside the asset
//! directory is served with a content type inferred from its extension;
//! anything else gets the shell document so client-side routing can take
//! over. Other methods never fall back.

use crate::http::{Method, Response};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

lazy_static! {
    static ref CONTENT_TYPES: HashMap<&'static str, &'static str> = {
        let mut types = HashMap::new();
        types.insert("html", "text/html");
        types.insert("css", "text/css");
        types.insert("js", "text/javascript");
        types.insert("json", "application/json");
        types.insert("png", "image/png");
        types.insert("jpg", "image/jpeg");
        types.insert("jpeg", "image/jpeg");
        types.insert("gif", "image/gif");
        types.insert("svg", "image/svg+xml");
        types.insert("ico", "image/x-icon");
        types
    };
}

pub struct AssetResolver {
    asset_dir: PathBuf,
    shell: PathBuf,
}

impl AssetResolver {
    /// `shell` is relative to the asset directory; conventionally
    /// `index.html`.
    pub fn new<P: AsRef<Path>>(asset_dir: P, shell: &str) -> Self {
        let asset_dir = asset_dir.as_ref().to_path_buf();
        let shell = asset_dir.join(shell);
        Self { asset_dir, shell }
    }

    /// Resolves an unmatched request. `None` means a final not-found:
    /// either the method does not fall back, or even the shell document
    /// is missing.
    pub fn resolve(&self, method: Method, path: &str) -> Option<Response> {
        if method != Method::GET && method != Method::HEAD {
            return None;
        }
        if let Some(response) = self.serve_asset(path) {
            return Some(response);
        }
        self.serve_shell()
    }

    fn serve_asset(&self, path: &str) -> Option<Response> {
        let file_path = self.asset_dir.join(path.trim_start_matches('/'));
        let canonical = fs::canonicalize(&file_path).ok()?;
        // Containment check blocks `..` traversal out of the asset dir.
        if !canonical.starts_with(fs::canonicalize(&self.asset_dir).ok()?) || !canonical.is_file() {
            return None;
        }
        self.serve_file(&canonical)
    }

    fn serve_shell(&self) -> Option<Response> {
        let contents = fs::read(&self.shell).ok()?;
        Some(Response::html(contents))
    }

    fn serve_file(&self, path: &Path) -> Option<Response> {
        let contents = fs::read(path).ok()?;
        let mut response = Response::new(200);

        let content_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|ext| CONTENT_TYPES.get(ext).copied())
            .unwrap_or("application/octet-stream");
        response.header("Content-Type", content_type);
        response.header("Cache-Control", "public, max-age=31536000");

        if let Ok(metadata) = fs::metadata(path) {
            if let Ok(modified) = metadata.modified() {
                if let Ok(duration) = modified.duration_since(SystemTime::UNIX_EPOCH) {
                    response.header(
                        "Last-Modified",
                        httpdate::fmt_http_date(SystemTime::UNIX_EPOCH + duration),
                    );
                    response.header("ETag", format!("\"{}-{}\"", metadata.len(), duration.as_secs()));
                }
            }
        }

        response.body = contents;
        Some(response)
    }
}
