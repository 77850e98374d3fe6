//! # routefs
//!
//! A file-based routing framework for Rust: the layout of a source tree
//! implicitly defines the URL surface.
//!
//! ## Features
//!
//! - Filesystem route discovery: directories are URL segments, file
//!   basenames are HTTP methods
//! - Bracket patterns: `[id]` binds a parameter, `[...rest]` catches all
//!   trailing segments
//! - Middleware chains with short-circuit and pass-through semantics
//! - Static asset serving with an SPA shell fallback
//! - A client-side page table with lazy module loading
//! - Async/await support
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use routefs::app::Application;
//! use routefs::loader::HandlerRegistry;
//! use routefs::router::RouteTableBuilder;
//! use routefs::Response;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = HandlerRegistry::new();
//!     registry.register("widgets/[id]/get.rs", |req| async move {
//!         let id = req.param("id").unwrap_or_default().to_string();
//!         Response::ok(&serde_json::json!({ "id": id }))
//!     });
//!
//!     let table = RouteTableBuilder::new(&registry)
//!         .prefix("/api")
//!         .build(Path::new("routes"))?;
//!
//!     let mut app = Application::new(table);
//!     app.assets("dist", "index.html");
//!     app.listen("127.0.0.1:3000")
//! }
//! ```

pub mod app;
pub mod assets;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod loader;
pub mod middleware;
pub mod pattern;
pub mod router;
pub mod state;
pub extern crate serde_json;

pub use crate::app::Application;
pub use crate::config::ServerConfig;
pub use crate::error::{ServerError, ServerResult};
pub use crate::http::{Method, Request, Response};
pub use crate::loader::{HandlerRegistry, ModuleLoader};
pub use crate::router::{RouteTable, RouteTableBuilder};

// Reexport serde_json
pub use serde_json::{json, Value};
