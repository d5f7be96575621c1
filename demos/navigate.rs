//! Navigation demo
//!
//! Starts a small JSON API, declares two routes with fetch specs, navigates
//! between them, and prints the route state as it changes.
//!
//! Run with: RUST_LOG=router_fetch=debug cargo run --example navigate

use axum::{extract::Path, routing::get, Json, Router};
use router_fetch::client::{ClientConfig, NavigationMode};
use router_fetch::{
    FetchGuard, FetchSpec, NavigationHooks, RequestOptions, Route, RouteFetchOptions, RouterFetch, SingleSpec,
};
use serde_json::{json, Value};
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

/// Just enough of a router to drive the guard.
#[derive(Default)]
struct DemoRouter {
    guards: Vec<FetchGuard>,
}

impl NavigationHooks for DemoRouter {
    fn before_each(&mut self, guard: FetchGuard) {
        self.guards.push(guard);
    }
}

impl DemoRouter {
    async fn push(&self, route: &Route) -> router_fetch::Result<()> {
        println!("\n-> navigating to {}", route.path);
        for guard in &self.guards {
            guard.before_each(route).await?;
        }
        Ok(())
    }
}

async fn get_foo(Path(id): Path<u32>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(150)).await;
    Json(json!({ "id": id, "name": format!("foo #{id}") }))
}

async fn get_stats() -> Json<Value> {
    Json(json!({ "foos": 3, "bars": 7 }))
}

fn foo_route(id: u32) -> Route {
    Route::new(format!("/foos/{id}"))
        .with_matched("/foos/:id")
        .with_param("id", id.to_string())
        .with_fetch(FetchSpec::url("/api/foos/:id"))
}

fn home_route() -> Route {
    Route::new("/")
        .with_matched("/")
        .with_fetch(FetchSpec::named([
            ("stats", SingleSpec::url("/api/stats")),
            (
                "greeting",
                SingleSpec::resolver(|route: Route| async move {
                    Ok(json!(format!("welcome to {}", route.path)))
                }),
            ),
        ]))
        .with_fetch_options(RouteFetchOptions::named([(
            "stats",
            RequestOptions::new().with_header("X-Section", "home"),
        )]))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Router Fetch Navigation Example");
    println!("===============================");

    let api = Router::new()
        .route("/api/foos/{id}", get(get_foo))
        .route("/api/stats", get(get_stats));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move { axum::serve(listener, api).await });
    println!("Mock API on http://{addr}");

    let config = ClientConfig {
        navigation: NavigationMode::FireAndForget,
        base_url: Some(format!("http://{addr}")),
        ..Default::default()
    };
    let plugin = RouterFetch::with_config(config, RequestOptions::new().with_header("Authorization", "Bearer demo"));
    let mut router = DemoRouter::default();
    plugin.install(&mut router);

    let home = home_route();
    router.push(&home).await?;
    if let Some(pending) = plugin.use_route_fetch(&home).pending {
        pending.subscribe().wait_for(|busy| !busy).await?;
    }
    let view = plugin.use_route_fetch(&home);
    if let Some(data) = &view.data {
        for name in data.names() {
            println!("  data.{name} = {:?}", data.get_named(name).flatten());
        }
    }

    for id in [1, 2] {
        let route = foo_route(id);
        router.push(&route).await?;

        let view = plugin.use_route_fetch(&route);
        let Some(fetching) = view.fetching.as_ref().and_then(|f| f.single().cloned()) else {
            continue;
        };
        let mut changes = fetching.stream();
        let mut started = false;
        while let Some(busy) = changes.next().await {
            println!("  fetching = {busy}");
            if started && !busy {
                break;
            }
            started |= busy;
        }
        println!("  data = {:?}", view.data.as_ref().and_then(|d| d.get()).flatten());
    }

    let route = foo_route(2);
    let view = plugin.use_route_fetch(&route);
    let result = view.get("/api/foos/:id", None).await?;
    println!("\nad hoc GET -> {} {:?}", result.response.status, result.data);

    Ok(())
}
