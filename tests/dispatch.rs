//! End-to-end dispatch: table match, middleware chain, asset fallback,
//! and the error boundary.

use routefs::http::Body;
use routefs::loader::HandlerRegistry;
use routefs::middleware::{Flow, Middleware};
use routefs::router::RouteTableBuilder;
use routefs::{Application, Method, Request, Response};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, "").unwrap();
}

struct Fixture {
    app: Application,
    hits: Arc<AtomicUsize>,
    _routes: TempDir,
    _assets: TempDir,
}

fn fixture() -> Fixture {
    let routes = TempDir::new().unwrap();
    touch(routes.path(), "widgets/[id]/get.rs");
    touch(routes.path(), "widgets/[id]/delete.rs");
    touch(routes.path(), "files/[...path]/get.rs");
    touch(routes.path(), "guarded/get.rs");
    touch(routes.path(), "boom/get.rs");
    touch(routes.path(), "legacy/get.rs");
    touch(routes.path(), "signup/post.rs");
    touch(routes.path(), "echo/post.rs");

    let hits = Arc::new(AtomicUsize::new(0));
    let mut registry = HandlerRegistry::new();

    let handler_hits = hits.clone();
    registry.register("widgets/[id]/get.rs", move |req: Request| {
        let hits = handler_hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            let id = req.param("id").unwrap_or_default().to_string();
            Response::ok(&serde_json::json!({ "id": id }))
        }
    });
    registry.register("widgets/[id]/delete.rs", |_req| async {
        Ok(Response::no_content())
    });
    registry.register("files/[...path]/get.rs", |req: Request| async move {
        Ok(Response::text(req.param("path").unwrap_or_default()))
    });

    // Auth-style middleware: short-circuits without a token, stamps the
    // request otherwise.
    let guard: Vec<Box<dyn Middleware>> = vec![Box::new(|mut req: Request| async move {
        if req.get_header("authorization").is_none() {
            let mut denied = Response::text("denied");
            denied.status(401);
            return Ok(Flow::Respond(denied));
        }
        req.set_data("user", "ada");
        Ok(Flow::Next(req))
    })];
    registry.register_with("guarded/get.rs", guard, |req: Request| async move {
        let user: String = req.get_typed_data("user").unwrap_or_default();
        Ok(Response::text(user))
    });

    registry.register("legacy/get.rs", |_req| async {
        Ok(Response::redirect("/api/widgets"))
    });
    registry.register("signup/post.rs", |req: Request| async move {
        let form: HashMap<String, String> = req.body.x_www_form_urlencoded().unwrap_or_default();
        Response::created(&serde_json::json!({ "name": form.get("name") }))
    });
    registry.register("echo/post.rs", |req: Request| async move {
        Ok(Response::text(req.body.as_string()))
    });

    registry.register("boom/get.rs", |req: Request| async move {
        if req.param("never").is_none() {
            panic!("secret detail: db password is hunter2");
        }
        Ok(Response::no_content())
    });

    let table = RouteTableBuilder::new(&registry)
        .prefix("/api")
        .build(routes.path())
        .unwrap();

    let assets = TempDir::new().unwrap();
    fs::write(assets.path().join("index.html"), "<html>shell</html>").unwrap();
    fs::write(assets.path().join("app.js"), "console.log(1)").unwrap();

    let mut app = Application::new(table);
    app.assets(assets.path().to_str().unwrap(), "index.html");

    Fixture {
        app,
        hits,
        _routes: routes,
        _assets: assets,
    }
}

#[tokio::test]
async fn matched_route_binds_params_and_runs_once() {
    let f = fixture();
    let response = f.app.dispatch(Request::new(Method::GET, "/api/widgets/42")).await;
    assert_eq!(response.status, 200);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["id"], "42");
    assert_eq!(f.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn method_selects_the_handler_for_the_same_pattern() {
    let f = fixture();
    let response = f.app.dispatch(Request::new(Method::DELETE, "/api/widgets/42")).await;
    assert_eq!(response.status, 204);
    assert_eq!(f.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn catch_all_binds_joined_trailing_segments() {
    let f = fixture();
    let response = f.app.dispatch(Request::new(Method::GET, "/api/files/a/b/c")).await;
    assert_eq!(response.body, b"a/b/c");
}

#[tokio::test]
async fn unmatched_get_serves_the_shell_document() {
    let f = fixture();
    let response = f.app.dispatch(Request::new(Method::GET, "/shop/borgir")).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.headers["Content-Type"], "text/html");
    assert_eq!(response.body, b"<html>shell</html>");
}

#[tokio::test]
async fn unmatched_get_prefers_a_real_asset_over_the_shell() {
    let f = fixture();
    let response = f.app.dispatch(Request::new(Method::GET, "/app.js")).await;
    assert_eq!(response.headers["Content-Type"], "text/javascript");
    assert_eq!(response.body, b"console.log(1)");
}

#[tokio::test]
async fn unmatched_post_is_a_final_not_found_never_the_shell() {
    let f = fixture();
    let response = f.app.dispatch(Request::new(Method::POST, "/shop/borgir")).await;
    assert_eq!(response.status, 404);
    assert_ne!(response.body, b"<html>shell</html>");
}

#[tokio::test]
async fn head_reuses_the_get_route_with_an_empty_body() {
    let f = fixture();
    let response = f.app.dispatch(Request::new(Method::HEAD, "/api/widgets/7")).await;
    assert_eq!(response.status, 200);
    assert!(response.body.is_empty());
    assert_eq!(f.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn middleware_short_circuits_without_a_token() {
    let f = fixture();
    let response = f.app.dispatch(Request::new(Method::GET, "/api/guarded")).await;
    assert_eq!(response.status, 401);
    assert_eq!(response.body, b"denied");
}

#[tokio::test]
async fn middleware_stamps_data_for_the_terminal_handler() {
    let f = fixture();
    let mut req = Request::new(Method::GET, "/api/guarded");
    req.headers.insert("authorization".to_string(), "Bearer x".to_string());
    let response = f.app.dispatch(req).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"ada");
}

#[tokio::test]
async fn redirects_carry_a_location_header() {
    let f = fixture();
    let response = f.app.dispatch(Request::new(Method::GET, "/api/legacy")).await;
    assert_eq!(response.status, 302);
    assert_eq!(response.headers["Location"], "/api/widgets");
}

#[tokio::test]
async fn form_encoded_bodies_decode_into_fields() {
    let f = fixture();
    let mut req = Request::new(Method::POST, "/api/signup");
    req.body = Body::from_bytes(
        "application/x-www-form-urlencoded",
        b"name=ada%20lovelace&role=eng".to_vec(),
    );
    let response = f.app.dispatch(req).await;
    assert_eq!(response.status, 201);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["name"], "ada lovelace");
}

#[tokio::test]
async fn plain_text_bodies_reach_the_handler_verbatim() {
    let f = fixture();
    let mut req = Request::new(Method::POST, "/api/echo");
    req.body = Body::from_string("hello there");
    let response = f.app.dispatch(req).await;
    assert_eq!(response.body, b"hello there");
}

#[tokio::test]
async fn panicking_handlers_return_500_without_leaking_details() {
    let f = fixture();
    let response = f.app.dispatch(Request::new(Method::GET, "/api/boom")).await;
    assert_eq!(response.status, 500);
    let body = String::from_utf8_lossy(&response.body);
    assert!(!body.contains("hunter2"));
    assert!(body.contains("Internal server error"));
}
