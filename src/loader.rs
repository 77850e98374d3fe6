//! The module-loading seam between the route table builder and the host.
//!
//! The builder never imports code itself; it asks a [`ModuleLoader`] for
//! the module at a route file's path and takes whatever handler that
//! module exports. [`HandlerRegistry`] is the in-process implementation:
//! the host registers a handler (optionally wrapped in middleware) under
//! each route file path before the table is built.

use crate::error::{ServerError, ServerResult};
use crate::handler::{BoxHandler, IntoResponse};
use crate::http::Request;
use crate::middleware::{Middleware, MiddlewareChain};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A loaded route module: its default export, already composed into a
/// middleware chain ending in the terminal handler.
#[derive(Clone)]
pub struct RouteModule {
    pub chain: MiddlewareChain,
}

impl RouteModule {
    /// A module exporting a bare handler.
    pub fn new(handler: BoxHandler) -> Self {
        Self {
            chain: MiddlewareChain::with_handler(Vec::new(), handler),
        }
    }

    /// A module exporting a handler wrapped in middleware, outermost
    /// stage first.
    pub fn with_middleware(stages: Vec<Box<dyn Middleware>>, handler: BoxHandler) -> Self {
        Self {
            chain: MiddlewareChain::with_handler(stages, handler),
        }
    }
}

/// Resolves a route file path to its module.
///
/// A failed load is reported as [`ServerError::ModuleLoad`]; the table
/// builder skips such routes silently.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, route_file: &Path) -> ServerResult<RouteModule>;
}

/// In-process module loader backed by a path -> module map.
#[derive(Default)]
pub struct HandlerRegistry {
    modules: HashMap<PathBuf, RouteModule>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a route file path relative to the routes
    /// root, e.g. `widgets/[id]/get.rs`.
    pub fn register<F, R>(&mut self, route_file: &str, handler: F) -> &mut Self
    where
        F: Fn(Request) -> R + Send + Sync + Clone + 'static,
        R: IntoResponse + 'static,
    {
        self.modules
            .insert(PathBuf::from(route_file), RouteModule::new(Box::new(handler)));
        self
    }

    /// Registers a handler wrapped in middleware, outermost stage first.
    pub fn register_with<F, R>(
        &mut self,
        route_file: &str,
        stages: Vec<Box<dyn Middleware>>,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(Request) -> R + Send + Sync + Clone + 'static,
        R: IntoResponse + 'static,
    {
        self.modules.insert(
            PathBuf::from(route_file),
            RouteModule::with_middleware(stages, Box::new(handler)),
        );
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleLoader for HandlerRegistry {
    fn load(&self, route_file: &Path) -> ServerResult<RouteModule> {
        self.modules.get(route_file).cloned().ok_or_else(|| {
            ServerError::ModuleLoad(format!(
                "no handler registered for `{}`",
                route_file.display()
            ))
        })
    }
}
