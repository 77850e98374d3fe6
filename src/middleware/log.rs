use crate::http::Request;
use crate::middleware::{Flow, Middleware, MiddlewareResult};

/// Stock middleware that logs the request line and passes the request on
/// unchanged.
#[derive(Clone, Default)]
pub struct RequestLogger;

impl RequestLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for RequestLogger {
    fn call(&self, req: Request) -> MiddlewareResult {
        Box::pin(async move {
            tracing::info!(method = req.method.as_str(), path = %req.path, "request");
            Ok(Flow::Next(req))
        })
    }

    fn clone_box(&self) -> Box<dyn Middleware> {
        Box::new(self.clone())
    }
}
