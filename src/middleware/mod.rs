//! Middleware chains around a terminal handler.
//!
//! A chain is built once, when the route is registered, and run per
//! request. The current request threads through the chain by ownership:
//! every stage consumes it and decides how the chain proceeds:
//!
//! - [`Flow::Respond`] — short-circuit; the response goes straight back
//!   to the caller and later stages (including the terminal handler)
//!   never run.
//! - [`Flow::Next`] — the chain continues with the returned request as
//!   the new current one. Handing the request back unchanged is the
//!   pass-through case; handing back a modified or replacement request
//!   is how a stage rewrites what later stages see.
//!
//! The last stage is the terminal handler and must respond; a terminal
//! `Next` is a [`ServerError::ContractViolation`], a programming error
//! surfaced as a generic internal error at the dispatch boundary.
//!
//! Stages pass data onward by setting `req.data` before continuing; that
//! side channel is the supported middleware-to-handler mechanism.

mod log;

pub use log::RequestLogger;

use crate::error::{ServerError, ServerResult};
use crate::handler::{BoxHandler, Handler, HttpResponse};
use crate::http::{Request, Response};
use futures::future::BoxFuture;

/// What a middleware stage tells the chain to do next.
pub enum Flow {
    Respond(Response),
    Next(Request),
}

pub type MiddlewareResult = BoxFuture<'static, ServerResult<Flow>>;

pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request) -> MiddlewareResult;
    fn clone_box(&self) -> Box<dyn Middleware>;
}

impl Clone for Box<dyn Middleware> {
    fn clone(&self) -> Box<dyn Middleware> {
        self.clone_box()
    }
}

impl<F, R> Middleware for F
where
    F: Fn(Request) -> R + Send + Sync + Clone + 'static,
    R: std::future::Future<Output = ServerResult<Flow>> + Send + 'static,
{
    fn call(&self, req: Request) -> MiddlewareResult {
        Box::pin((self)(req))
    }

    fn clone_box(&self) -> Box<dyn Middleware> {
        Box::new(self.clone())
    }
}

/// An ordered, immutable sequence of stages ending in a terminal handler.
#[derive(Clone)]
pub struct MiddlewareChain {
    stages: Vec<Box<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new(stages: Vec<Box<dyn Middleware>>) -> Self {
        Self { stages }
    }

    /// Wraps a plain handler as the terminal stage of a chain.
    pub fn with_handler(stages: Vec<Box<dyn Middleware>>, handler: BoxHandler) -> Self {
        let mut stages = stages;
        stages.push(Box::new(TerminalStage { handler }));
        Self { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs the chain against a request.
    pub async fn run(&self, req: Request) -> HttpResponse {
        let Some((terminal, stages)) = self.stages.split_last() else {
            return Err(ServerError::ContractViolation(
                "middleware chain is empty".to_string(),
            ));
        };

        let mut current = req;
        for stage in stages {
            match stage.call(current).await? {
                Flow::Respond(response) => return Ok(response),
                Flow::Next(replacement) => current = replacement,
            }
        }

        match terminal.call(current).await? {
            Flow::Respond(response) => Ok(response),
            Flow::Next(_) => Err(ServerError::ContractViolation(
                "terminal handler did not return a response".to_string(),
            )),
        }
    }
}

/// Adapts a route module's handler into a terminal chain stage.
struct TerminalStage {
    handler: BoxHandler,
}

impl Middleware for TerminalStage {
    fn call(&self, req: Request) -> MiddlewareResult {
        let future = self.handler.handle(req);
        Box::pin(async move { future.await.map(Flow::Respond) })
    }

    fn clone_box(&self) -> Box<dyn Middleware> {
        Box::new(TerminalStage {
            handler: self.handler.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn req() -> Request {
        Request::new(Method::GET, "/chain")
    }

    fn counting_terminal(hits: Arc<AtomicUsize>) -> Box<dyn Middleware> {
        Box::new(move |_req: Request| {
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(Flow::Respond(Response::text("terminal")))
            }
        })
    }

    #[tokio::test]
    async fn pass_through_stage_is_observationally_inert() {
        let hits = Arc::new(AtomicUsize::new(0));

        let bare = MiddlewareChain::new(vec![counting_terminal(hits.clone())]);
        let with_noop = MiddlewareChain::new(vec![
            Box::new(|req: Request| async move { Ok(Flow::Next(req)) }),
            counting_terminal(hits.clone()),
        ]);

        let a = bare.run(req()).await.unwrap();
        let b = with_noop.run(req()).await.unwrap();
        assert_eq!(a.status, b.status);
        assert_eq!(a.body, b.body);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn short_circuit_skips_the_terminal_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = MiddlewareChain::new(vec![
            Box::new(|req: Request| async move { Ok(Flow::Next(req)) }),
            Box::new(|_req: Request| async move {
                let mut response = Response::text("blocked");
                response.status(418);
                Ok(Flow::Respond(response))
            }),
            counting_terminal(hits.clone()),
        ]);

        let response = chain.run(req()).await.unwrap();
        assert_eq!(response.status, 418);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn replacement_request_reaches_later_stages() {
        let chain = MiddlewareChain::new(vec![
            Box::new(|mut req: Request| async move {
                req.set_data("stamp", "from-middleware");
                Ok(Flow::Next(req))
            }),
            Box::new(|req: Request| async move {
                let stamp: String = req.get_typed_data("stamp").unwrap_or_default();
                Ok(Flow::Respond(Response::text(stamp)))
            }),
        ]);

        let response = chain.run(req()).await.unwrap();
        assert_eq!(response.body, b"from-middleware");
    }

    #[tokio::test]
    async fn terminal_next_is_a_contract_violation() {
        let chain =
            MiddlewareChain::new(vec![Box::new(|req: Request| async move {
                Ok(Flow::Next(req))
            })]);

        let err = chain.run(req()).await.unwrap_err();
        assert!(matches!(err, ServerError::ContractViolation(_)));
        assert_eq!(err.status_code(), 500);
    }
}
