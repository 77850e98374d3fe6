//! The client-side page table and navigation.
//!
//! The host build tool enumerates page module paths under the pages root
//! and supplies a lazy loader per path; this module compiles them into an
//! ordered table, designates the `404` page as the fallback, and matches
//! navigation paths against it. Pages under `api/` belong to the server
//! and never enter the table.
//!
//! Matching has no HTTP method: every navigation is an implicit render.

use crate::error::{ServerError, ServerResult};
use crate::pattern::{self, Pattern};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lazily loads a page module and yields its default export.
pub type PageLoader<C> = Arc<dyn Fn() -> BoxFuture<'static, ServerResult<C>> + Send + Sync>;

pub struct PageEntry<C> {
    pub pattern: Pattern,
    pub loader: PageLoader<C>,
    pub is_fallback: bool,
}

/// A matched navigation: the entry to render plus parameter bindings.
pub struct PageMatch<'a, C> {
    pub entry: &'a PageEntry<C>,
    pub params: HashMap<String, String>,
}

/// Ordered page table built once from the host's module enumeration.
///
/// Entry order reflects discovery order; the fallback, if any, is a
/// single entry kept last and excluded from normal matching.
pub struct PageTable<C> {
    entries: Vec<PageEntry<C>>,
}

impl<C> PageTable<C> {
    /// Compiles `(module path, loader)` pairs into a table.
    ///
    /// `api/` subtrees are excluded, the first `404` module becomes the
    /// fallback (later ones are ignored), and malformed bracket syntax
    /// aborts the build.
    pub fn from_modules<I>(modules: I) -> ServerResult<PageTable<C>>
    where
        I: IntoIterator<Item = (String, PageLoader<C>)>,
    {
        let mut entries = Vec::new();
        let mut fallback: Option<PageEntry<C>> = None;

        for (path, loader) in modules {
            if pattern::is_api_path(&path) {
                continue;
            }
            let compiled = Pattern::compile(&path)?;
            if pattern::is_fallback_path(&path) {
                if fallback.is_some() {
                    tracing::warn!(%path, "ignoring extra 404 page; fallback already designated");
                    continue;
                }
                fallback = Some(PageEntry {
                    pattern: compiled,
                    loader,
                    is_fallback: true,
                });
                continue;
            }
            entries.push(PageEntry {
                pattern: compiled,
                loader,
                is_fallback: false,
            });
        }

        if let Some(fallback) = fallback {
            entries.push(fallback);
        }
        Ok(PageTable { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Matches a navigation path. Same precedence as the server matcher:
    /// static patterns first, discovery order within each half. With no
    /// match the fallback entry is returned with empty params; `None`
    /// only when no 404 page was registered.
    pub fn match_path(&self, path: &str) -> Option<PageMatch<'_, C>> {
        let routable = self.entries.iter().filter(|e| !e.is_fallback);
        let statics = routable.clone().filter(|e| !e.pattern.is_dynamic());
        let dynamics = routable.filter(|e| e.pattern.is_dynamic());

        for entry in statics.chain(dynamics) {
            if let Some(params) = entry.pattern.matches(path) {
                return Some(PageMatch { entry, params });
            }
        }
        self.entries
            .iter()
            .find(|e| e.is_fallback)
            .map(|entry| PageMatch {
                entry,
                params: HashMap::new(),
            })
    }
}

/// The outcome of a completed navigation.
#[derive(Debug)]
pub struct ResolvedPage<C> {
    pub component: C,
    pub params: HashMap<String, String>,
    pub is_fallback: bool,
}

/// Drives navigations against a page table.
///
/// Loading a page module is a suspension point; a navigation started
/// while an earlier load is in flight supersedes it. The stale load's
/// result is discarded when it resolves — `navigate` returns `Ok(None)`
/// for superseded navigations so the host never renders a stale target.
pub struct Navigator<C> {
    table: Arc<PageTable<C>>,
    epoch: AtomicU64,
}

impl<C> Navigator<C> {
    pub fn new(table: PageTable<C>) -> Self {
        Self {
            table: Arc::new(table),
            epoch: AtomicU64::new(0),
        }
    }

    pub async fn navigate(&self, path: &str) -> ServerResult<Option<ResolvedPage<C>>> {
        let my_epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(matched) = self.table.match_path(path) else {
            return Err(ServerError::NotFound);
        };
        let params = matched.params;
        let is_fallback = matched.entry.is_fallback;
        let load = (matched.entry.loader)();

        // Suspension point: a newer navigate() bumps the epoch and this
        // load's result is discarded.
        let component = load.await?;
        if self.epoch.load(Ordering::SeqCst) != my_epoch {
            return Ok(None);
        }
        Ok(Some(ResolvedPage {
            component,
            params,
            is_fallback,
        }))
    }
}
