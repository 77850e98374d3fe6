//! Client-side page table demo.
//!
//! Builds a page table from the module paths a bundler would enumerate
//! under `pages/`, then drives a few navigations through the lazy
//! loaders. The "component" here is just a string; a UI runtime would
//! plug in its own component type.

use routefs::client::{Navigator, PageLoader, PageTable};
use std::sync::Arc;

fn page(markup: &'static str) -> PageLoader<&'static str> {
    Arc::new(move || Box::pin(async move { Ok(markup) }))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let table = PageTable::from_modules(vec![
        ("index.jsx".to_string(), page("<Home/>")),
        ("404.jsx".to_string(), page("<NotFound/>")),
        ("[shop]/route.jsx".to_string(), page("<ShopRoute/>")),
        ("api/widgets/[id].ts".to_string(), page("<ServerOwned/>")),
    ])?;

    let navigator = Navigator::new(table);
    for path in ["/", "/borgir/route", "/no/such/page"] {
        match navigator.navigate(path).await? {
            Some(resolved) => println!(
                "{path} -> {} (params: {:?}, fallback: {})",
                resolved.component, resolved.params, resolved.is_fallback
            ),
            None => println!("{path} -> superseded"),
        }
    }
    Ok(())
}
