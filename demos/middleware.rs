//! Middleware chain demo.
//!
//! Shows the three things a stage can do: pass the request through
//! unchanged, hand later stages a modified request, or short-circuit
//! with its own response.

use routefs::handler::BoxHandler;
use routefs::middleware::{Flow, Middleware, MiddlewareChain, RequestLogger};
use routefs::{Method, Request, Response, ServerError};

// Rejects requests without a bearer token, stamping the user otherwise.
fn auth(mut req: Request) -> impl std::future::Future<Output = Result<Flow, ServerError>> {
    async move {
        match req.get_header("authorization") {
            Some(token) if token.starts_with("Bearer ") => {
                req.set_data("user", token.trim_start_matches("Bearer ").to_string());
                Ok(Flow::Next(req))
            }
            _ => {
                let mut denied = Response::text("authentication required");
                denied.status(401);
                Ok(Flow::Respond(denied))
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let terminal: BoxHandler = Box::new(|req: Request| async move {
        let user: String = req.get_typed_data("user").unwrap_or_default();
        Response::ok(&serde_json::json!({ "hello": user }))
    });

    let chain = MiddlewareChain::with_handler(
        vec![Box::new(RequestLogger::new()), Box::new(auth)],
        terminal,
    );

    let mut authorized = Request::new(Method::GET, "/profile");
    authorized
        .headers
        .insert("authorization".to_string(), "Bearer ada".to_string());
    let response = chain.run(authorized).await?;
    println!("authorized -> {} {}", response.status, String::from_utf8_lossy(&response.body));

    let anonymous = Request::new(Method::GET, "/profile");
    let response = chain.run(anonymous).await?;
    println!("anonymous  -> {} {}", response.status, String::from_utf8_lossy(&response.body));

    Ok(())
}
