//! The server route table and matcher.
//!
//! The table is built once, before the server accepts connections, and
//! never mutated afterwards; the dispatch loop reads it concurrently
//! without locking.

mod builder;

pub use builder::RouteTableBuilder;

use crate::http::Method;
use crate::middleware::MiddlewareChain;
use crate::pattern::Pattern;
use std::collections::HashMap;

/// One registered route: a compiled pattern and its handler chain.
#[derive(Clone)]
pub struct RouteEntry {
    pub pattern: Pattern,
    pub(crate) chain: MiddlewareChain,
}

/// A successful match: the winning entry plus its parameter bindings.
pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,
    pub params: HashMap<String, String>,
}

/// Immutable mapping from HTTP method to its registered routes.
///
/// Entries keep discovery order. Within a method a pattern string is
/// unique: re-registering replaces the handler in place, so the last
/// registration wins while the original position is kept.
#[derive(Default, Clone)]
pub struct RouteTable {
    routes: HashMap<Method, Vec<RouteEntry>>,
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable").finish_non_exhaustive()
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, method: Method, pattern: Pattern, chain: MiddlewareChain) {
        let entries = self.routes.entry(method).or_default();
        let key = pattern.to_string();
        if let Some(existing) = entries.iter_mut().find(|e| e.pattern.to_string() == key) {
            existing.chain = chain;
        } else {
            entries.push(RouteEntry { pattern, chain });
        }
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered pattern strings for a method, in discovery order.
    pub fn patterns(&self, method: Method) -> Vec<String> {
        self.routes
            .get(&method)
            .map(|entries| entries.iter().map(|e| e.pattern.to_string()).collect())
            .unwrap_or_default()
    }

    /// Finds the first route matching the path.
    ///
    /// Candidates are partitioned static-first: patterns with no bound
    /// parameters are tried before any pattern with one, in discovery
    /// order within each half. That stable partition is the only
    /// precedence guarantee; two dynamic patterns are tied and discovery
    /// order decides. No match is a normal outcome, signalling the
    /// caller to fall back to asset resolution.
    pub fn match_route(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        let entries = self.routes.get(&method)?;
        let statics = entries.iter().filter(|e| !e.pattern.is_dynamic());
        let dynamics = entries.iter().filter(|e| e.pattern.is_dynamic());

        for entry in statics.chain(dynamics) {
            if let Some(params) = entry.pattern.matches(path) {
                return Some(RouteMatch { entry, params });
            }
        }
        None
    }
}
