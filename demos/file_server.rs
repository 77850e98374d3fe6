//! File-based routing demo.
//!
//! Materializes a small routes tree on disk, registers a handler per
//! route file, and serves the resulting table with an SPA shell
//! fallback. Try:
//!
//! ```text
//! curl http://127.0.0.1:3000/api/widgets/42
//! curl -X POST http://127.0.0.1:3000/api/widgets
//! curl http://127.0.0.1:3000/anything/else   # -> the shell document
//! ```

use routefs::loader::HandlerRegistry;
use routefs::router::RouteTableBuilder;
use routefs::{created_json, ok_json, Application, Request, Response, ServerConfig};
use std::fs;
use std::path::Path;

fn scaffold(root: &Path) -> std::io::Result<()> {
    for file in ["widgets/get.rs", "widgets/post.rs", "widgets/[id]/get.rs"] {
        let path = root.join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, "")?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    scaffold(&config.routes_dir)?;

    fs::create_dir_all(&config.static_dir)?;
    fs::write(
        config.static_dir.join(&config.shell),
        "<html><body><div id=\"root\"></div></body></html>",
    )?;

    let mut registry = HandlerRegistry::new();
    registry.register("widgets/get.rs", |_req| async {
        ok_json!({ "widgets": ["anvil", "sprocket"] })
    });
    registry.register("widgets/post.rs", |req: Request| async move {
        let name = req
            .body
            .json::<serde_json::Value>()
            .and_then(|v| v.get("name").cloned());
        created_json!({ "created": name })
    });
    registry.register("widgets/[id]/get.rs", |req: Request| async move {
        let id = req.param("id").unwrap_or_default().to_string();
        Response::ok(&serde_json::json!({ "id": id }))
    });

    let table = RouteTableBuilder::new(&registry)
        .prefix("/api")
        .build(&config.routes_dir)?;

    let mut app = Application::new(table);
    app.assets(config.static_dir.to_str().unwrap_or("dist"), &config.shell);
    app.listen(&config.addr())
}
