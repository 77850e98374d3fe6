//! Builds a [`RouteTable`] from a routes directory.
//!
//! Directory nesting encodes the URL path; a file's basename (minus
//! extension), uppercased, names the HTTP method it serves. Anything
//! else is ignored. `widgets/[id]/get.rs` under the root registers
//! `GET /widgets/:id`.

use crate::error::{ServerError, ServerResult};
use crate::http::request::ROUTE_METHODS;
use crate::http::Method;
use crate::loader::ModuleLoader;
use crate::pattern::Pattern;
use crate::router::RouteTable;
use std::fs;
use std::path::Path;

pub struct RouteTableBuilder<'a> {
    loader: &'a dyn ModuleLoader,
    prefix: String,
}

impl<'a> RouteTableBuilder<'a> {
    pub fn new(loader: &'a dyn ModuleLoader) -> Self {
        Self {
            loader,
            prefix: String::new(),
        }
    }

    /// URL prefix prepended to every registered pattern, e.g. `/api`.
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.trim_matches('/').to_string();
        self
    }

    /// Walks the routes root once and produces the immutable table.
    ///
    /// Routes whose module fails to load are skipped; a malformed
    /// bracket segment anywhere aborts the build.
    pub fn build(&self, routes_root: &Path) -> ServerResult<RouteTable> {
        let mut table = RouteTable::new();
        self.walk(routes_root, "", &mut table)?;
        tracing::info!(routes = table.len(), root = %routes_root.display(), "route table built");
        Ok(table)
    }

    fn walk(&self, dir: &Path, rel: &str, table: &mut RouteTable) -> ServerResult<()> {
        let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
        // Lexicographic order keeps duplicate resolution deterministic
        // regardless of what the filesystem hands back.
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let child = entry.path();
            let rel_child = if rel.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", rel, name)
            };

            if child.is_dir() {
                // The fallback is synthesized at dispatch time, never a
                // table entry.
                if name.eq_ignore_ascii_case("404") {
                    tracing::debug!(dir = %child.display(), "skipping reserved 404 directory");
                    continue;
                }
                self.walk(&child, &rel_child, table)?;
                continue;
            }

            let Some(stem) = child.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(method) = Method::parse(&stem.to_uppercase()) else {
                continue;
            };
            if !ROUTE_METHODS.contains(&method) {
                continue;
            }

            // Malformed bracket syntax is fatal even when the module
            // would not have loaded.
            let pattern = self.dir_pattern(rel)?;

            let module = match self.loader.load(Path::new(&rel_child)) {
                Ok(module) => module,
                Err(ServerError::ModuleLoad(msg)) => {
                    tracing::debug!(file = %rel_child, %msg, "skipping route");
                    continue;
                }
                Err(err) => return Err(err),
            };
            tracing::debug!(method = method.as_str(), pattern = %pattern, "registered route");
            table.insert(method, pattern, module.chain);
        }
        Ok(())
    }

    fn dir_pattern(&self, rel: &str) -> ServerResult<Pattern> {
        let joined = match (self.prefix.is_empty(), rel.is_empty()) {
            (true, _) => rel.to_string(),
            (false, true) => self.prefix.clone(),
            (false, false) => format!("{}/{}", self.prefix, rel),
        };
        Pattern::compile(&joined)
    }
}
