mod common;

use common::{fetch_meta, MemoryRouter, MockTransport};
use router_fetch::client::{ClientConfig, FetchResponse, NavigationMode};
use router_fetch::{
    FetchError, FetchSpec, Observable, RequestOptions, Route, RouteFetchOptions, RouteKey, RouteMeta,
    RouterFetch, SingleSpec,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_test::{assert_pending, assert_ready};

fn setup(mode: NavigationMode, global: RequestOptions) -> (Arc<MockTransport>, RouterFetch) {
    let config = ClientConfig {
        navigation: mode,
        ..Default::default()
    };
    setup_with(config, global)
}

fn setup_with(config: ClientConfig, global: RequestOptions) -> (Arc<MockTransport>, RouterFetch) {
    let transport = Arc::new(MockTransport::new());
    let plugin = RouterFetch::with_transport(config, global, transport.clone());
    (transport, plugin)
}

fn foos_router(plugin: &RouterFetch) -> MemoryRouter {
    let mut router = MemoryRouter::new()
        .route("/", RouteMeta::default())
        .route("/foos/:id", fetch_meta(FetchSpec::url("https://api/foos/:id")));
    plugin.install(&mut router);
    router
}

async fn wait_until<T: Clone>(cell: &Observable<T>, pred: impl FnMut(&T) -> bool) {
    let mut rx = cell.subscribe();
    timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("timed out waiting for cell")
        .expect("cell sender dropped");
}

#[tokio::test]
async fn test_single_fetch_end_to_end() {
    let (transport, plugin) = setup(NavigationMode::FireAndForget, RequestOptions::new());
    let mut router = foos_router(&plugin);
    let release = transport.hold("https://api/foos/42");

    router.push("/foos/42").await.unwrap();

    let state = plugin.state_for(&RouteKey::from("/foos/:id")).unwrap();
    let fetching = state.fetching.single().unwrap().clone();
    wait_until(&fetching, |busy| *busy).await;
    assert_eq!(state.data.get(), Some(None));

    let body = r#"{"id":42,"name":"foo"}"#;
    release.send(FetchResponse::new(200, body)).unwrap();
    wait_until(&fetching, |busy| !*busy).await;

    assert_eq!(transport.urls(), vec!["https://api/foos/42"]);
    assert_eq!(state.data.get(), Some(Some(json!({"id": 42, "name": "foo"}))));
    assert_eq!(
        state.response.get(),
        Some(Some(FetchResponse::new(200, body).with_url("https://api/foos/42")))
    );
}

#[tokio::test]
async fn test_named_fetches_are_isolated() {
    let (transport, plugin) = setup(NavigationMode::FireAndForget, RequestOptions::new());
    let mut router = MemoryRouter::new().route(
        "/home",
        fetch_meta(FetchSpec::named([("foo", "https://api/foo"), ("bar", "https://api/bar")])),
    );
    plugin.install(&mut router);
    let release_foo = transport.hold("https://api/foo");
    let release_bar = transport.hold("https://api/bar");

    router.push("/home").await.unwrap();

    let state = plugin.state_for(&RouteKey::from("/home")).unwrap();
    let foo_fetching = state.fetching.named("foo").unwrap().clone();
    let bar_fetching = state.fetching.named("bar").unwrap().clone();
    wait_until(&foo_fetching, |busy| *busy).await;
    wait_until(&bar_fetching, |busy| *busy).await;
    assert!(state.pending.get());

    release_foo.send(FetchResponse::new(200, r#"{"name":"foo"}"#)).unwrap();
    wait_until(&foo_fetching, |busy| !*busy).await;

    assert!(bar_fetching.get());
    assert!(state.pending.get());
    assert_eq!(state.data.get_named("foo"), Some(Some(json!({"name": "foo"}))));
    assert_eq!(state.data.get_named("bar"), Some(None));

    release_bar.send(FetchResponse::new(200, r#"{"name":"bar"}"#)).unwrap();
    wait_until(&state.pending, |pending| !*pending).await;

    assert!(!foo_fetching.get());
    assert!(!bar_fetching.get());
    assert_eq!(state.data.get_named("bar"), Some(Some(json!({"name": "bar"}))));
    assert_eq!(transport.urls().len(), 2);
}

#[tokio::test]
async fn test_failed_fetch_clears_fetching_and_leaves_data() {
    let (transport, plugin) = setup(NavigationMode::Await, RequestOptions::new());
    let mut router = foos_router(&plugin);
    transport.fail("https://api/foos/1", "connection refused");

    let err = router.push("/foos/1").await.unwrap_err();
    assert!(err.is_network());

    let state = plugin.state_for(&RouteKey::from("/foos/:id")).unwrap();
    assert_eq!(state.fetching.get(), Some(false));
    assert_eq!(state.data.get(), Some(None));
    assert_eq!(state.response.get(), Some(None));
    assert!(!state.pending.get());
}

#[tokio::test]
async fn test_failed_refetch_keeps_previous_data() {
    let (transport, plugin) = setup(NavigationMode::Await, RequestOptions::new());
    let mut router = foos_router(&plugin);
    transport.respond("https://api/foos/1", 200, r#"{"id":1}"#);
    router.push("/foos/1").await.unwrap();

    transport.fail("https://api/foos/2", "timeout");
    assert!(router.push("/foos/2").await.is_err());

    let state = plugin.state_for(&RouteKey::from("/foos/:id")).unwrap();
    assert_eq!(state.fetching.get(), Some(false));
    assert_eq!(state.data.get(), Some(Some(json!({"id": 1}))));
    assert_eq!(
        state.response.get().flatten().map(|r| r.url),
        Some("https://api/foos/1".to_string())
    );
}

#[tokio::test]
async fn test_background_failure_does_not_block_navigation() {
    let (transport, plugin) = setup(NavigationMode::FireAndForget, RequestOptions::new());
    let mut router = foos_router(&plugin);
    let release = transport.hold("https://api/foos/9");

    let route = router.push("/foos/9").await.unwrap();
    assert_eq!(router.current().map(|r| r.path.as_str()), Some("/foos/9"));

    let state = plugin.state_for(&route.key()).unwrap();
    wait_until(&state.pending, |pending| *pending).await;
    drop(release);
    wait_until(&state.pending, |pending| !*pending).await;
    assert_eq!(state.fetching.get(), Some(false));
    assert_eq!(state.data.get(), Some(None));
}

#[tokio::test]
async fn test_resolver_result_stored_verbatim() {
    let (transport, plugin) = setup(NavigationMode::Await, RequestOptions::new());
    let seen = Arc::new(parking_lot::Mutex::new(None::<Route>));
    let captured = seen.clone();
    let mut router = MemoryRouter::new().route(
        "/users/:name",
        fetch_meta(FetchSpec::resolver(move |route: Route| {
            let captured = captured.clone();
            async move {
                let greeting = format!("hello {}", route.params["name"]);
                *captured.lock() = Some(route);
                Ok(json!({ "greeting": greeting }))
            }
        })),
    );
    plugin.install(&mut router);

    router.push("/users/ada?tab=posts").await.unwrap();

    let state = plugin.state_for(&RouteKey::from("/users/:name")).unwrap();
    assert_eq!(state.data.get(), Some(Some(json!({"greeting": "hello ada"}))));
    assert_eq!(state.response.get(), Some(None));
    assert!(transport.requests().is_empty());

    let route = seen.lock().clone().unwrap();
    assert_eq!(route.path, "/users/ada");
    assert_eq!(route.query["tab"], "posts");
}

#[tokio::test]
async fn test_route_without_fetch_creates_nothing() {
    let (transport, plugin) = setup(NavigationMode::Await, RequestOptions::new());
    let mut router = foos_router(&plugin);

    let route = router.push("/").await.unwrap();

    assert!(plugin.state().keys().is_empty());
    assert!(plugin.actions_for(&route.key()).is_none());
    assert!(transport.requests().is_empty());

    let view = plugin.use_route_fetch(&route);
    assert!(!view.is_ready());
    assert!(view.data.is_none());
    assert!(view.fetch.is_none());
    let err = view.get("https://api/foos", None).await.unwrap_err();
    assert!(matches!(err, FetchError::Uninitialized(_)));
}

#[tokio::test]
async fn test_state_reused_and_params_recaptured() {
    let (transport, plugin) = setup(NavigationMode::Await, RequestOptions::new());
    let mut router = foos_router(&plugin);

    router.push("/foos/1").await.unwrap();
    let first = plugin.state_for(&RouteKey::from("/foos/:id")).unwrap();
    router.push("/foos/2").await.unwrap();
    let second = plugin.state_for(&RouteKey::from("/foos/:id")).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(plugin.state().keys(), vec![RouteKey::from("/foos/:id")]);
    assert_eq!(transport.urls(), vec!["https://api/foos/1", "https://api/foos/2"]);
    assert_eq!(second.data.get(), Some(Some(json!({"url": "https://api/foos/2"}))));
}

#[tokio::test]
async fn test_global_and_route_options_reach_the_wire() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let global = RequestOptions::new().with_computed_headers(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        [("Authorization".to_string(), format!("Bearer {n}"))].into()
    });
    let (transport, plugin) = setup(NavigationMode::Await, global);

    let meta = RouteMeta {
        fetch: Some(FetchSpec::named([
            ("search", SingleSpec::url("https://api/search?q=:term")),
            ("plain", SingleSpec::url("https://api/plain")),
        ])),
        fetch_options: Some(RouteFetchOptions::named([(
            "search",
            RequestOptions::new().with_method("POST").with_header("X-Trace", "1"),
        )])),
    };
    let mut router = MemoryRouter::new().route("/search/:term", meta);
    plugin.install(&mut router);

    router.push("/search/rust").await.unwrap();
    router.push("/search/tokio").await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 4);

    let search: Vec<_> = requests.iter().filter(|r| r.url.starts_with("https://api/search")).collect();
    assert_eq!(search[0].url, "https://api/search?q=rust");
    assert_eq!(search[1].url, "https://api/search?q=tokio");
    assert!(search.iter().all(|r| r.method == "POST"));
    assert!(search.iter().all(|r| r.headers["X-Trace"] == "1"));

    let plain = requests.iter().find(|r| r.url == "https://api/plain").unwrap();
    assert_eq!(plain.method, "GET");
    assert!(!plain.headers.contains_key("X-Trace"));

    assert!(requests.iter().all(|r| r.headers["Content-Type"] == "application/json"));
    assert!(requests.iter().all(|r| r.headers["Authorization"].starts_with("Bearer ")));
    assert!(calls.load(Ordering::SeqCst) >= 4);
}

#[tokio::test]
async fn test_projection_is_live_and_exposes_helpers() {
    let (transport, plugin) = setup(NavigationMode::Await, RequestOptions::new().with_header("X-App", "demo"));
    let mut router = foos_router(&plugin);
    transport.respond("https://api/foos/42", 200, r#"{"v":1}"#);

    let route = router.push("/foos/42").await.unwrap();
    let view = plugin.use_route_fetch(&route);
    assert!(view.is_ready());
    let data = view.data.clone().unwrap();
    assert_eq!(data.get(), Some(Some(json!({"v": 1}))));

    transport.respond("https://api/foos/42", 200, r#"{"v":2}"#);
    view.fetch.as_ref().unwrap().run().await.unwrap();
    assert_eq!(data.get(), Some(Some(json!({"v": 2}))));

    transport.respond("https://api/foos/42/comments", 201, r#"{"ok":true}"#);
    let result = view
        .post("https://api/foos/:id/comments", &json!({"text": "hi"}), None)
        .await
        .unwrap();
    assert_eq!(result.response.status, 201);
    assert_eq!(result.data.unwrap(), json!({"ok": true}));

    let sent = transport.requests().pop().unwrap();
    assert_eq!(sent.method, "POST");
    assert_eq!(sent.url, "https://api/foos/42/comments");
    assert_eq!(sent.body.as_deref(), Some(r#"{"text":"hi"}"#));
    assert_eq!(sent.headers["X-App"], "demo");

    // helper calls never touch route state
    assert_eq!(data.get(), Some(Some(json!({"v": 2}))));
}

#[tokio::test]
async fn test_await_mode_blocks_until_settled() {
    let (transport, plugin) = setup(NavigationMode::Await, RequestOptions::new());
    let guard = plugin.guard();
    let route = Route::new("/foos/7")
        .with_matched("/foos/:id")
        .with_param("id", "7")
        .with_fetch(FetchSpec::url("https://api/foos/:id"));
    let release = transport.hold("https://api/foos/7");

    let mut navigation = tokio_test::task::spawn(guard.before_each(&route));
    assert_pending!(navigation.poll());

    let state = plugin.state_for(&route.key()).unwrap();
    assert_eq!(state.fetching.get(), Some(true));
    assert!(state.pending.get());

    release.send(FetchResponse::new(200, "[1,2,3]")).unwrap();
    assert!(navigation.is_woken());
    assert_ready!(navigation.poll()).unwrap();

    assert_eq!(state.data.get(), Some(Some(json!([1, 2, 3]))));
    assert_eq!(state.fetching.get(), Some(false));
}

#[tokio::test]
async fn test_stale_response_overwrites_without_fencing() {
    let (transport, plugin) = setup(NavigationMode::FireAndForget, RequestOptions::new());
    let mut router = foos_router(&plugin);
    let first = transport.hold("https://api/foos/1");
    let second = transport.hold("https://api/foos/2");

    router.push("/foos/1").await.unwrap();
    router.push("/foos/2").await.unwrap();
    let state = plugin.state_for(&RouteKey::from("/foos/:id")).unwrap();
    wait_until(&state.pending, |pending| *pending).await;

    second.send(FetchResponse::new(200, r#"{"id":2}"#)).unwrap();
    let data = state.data.single().unwrap().clone();
    wait_until(&data, |value| value.is_some()).await;
    first.send(FetchResponse::new(200, r#"{"id":1}"#)).unwrap();
    wait_until(&state.pending, |pending| !*pending).await;

    assert_eq!(state.data.get(), Some(Some(json!({"id": 1}))));
}

#[tokio::test]
async fn test_fencing_keeps_newest_response() {
    let config = ClientConfig {
        fence_stale_responses: true,
        ..Default::default()
    };
    let (transport, plugin) = setup_with(config, RequestOptions::new());
    let mut router = foos_router(&plugin);
    let first = transport.hold("https://api/foos/1");
    let second = transport.hold("https://api/foos/2");

    router.push("/foos/1").await.unwrap();
    router.push("/foos/2").await.unwrap();
    let state = plugin.state_for(&RouteKey::from("/foos/:id")).unwrap();
    wait_until(&state.pending, |pending| *pending).await;

    second.send(FetchResponse::new(200, r#"{"id":2}"#)).unwrap();
    let fetching = state.fetching.single().unwrap().clone();
    wait_until(&fetching, |busy| !*busy).await;
    first.send(FetchResponse::new(200, r#"{"id":1}"#)).unwrap();
    wait_until(&state.pending, |pending| !*pending).await;

    assert_eq!(state.data.get(), Some(Some(json!({"id": 2}))));
    assert_eq!(
        state.response.get().flatten().map(|r| r.url),
        Some("https://api/foos/2".to_string())
    );
    assert_eq!(state.fetching.get(), Some(false));
}

#[tokio::test]
async fn test_named_trigger_by_name_leaves_pending_alone() {
    let (transport, plugin) = setup(NavigationMode::Await, RequestOptions::new());
    let mut router = MemoryRouter::new().route(
        "/dash",
        fetch_meta(FetchSpec::named([("stats", "https://api/stats"), ("feed", "https://api/feed")])),
    );
    plugin.install(&mut router);
    router.push("/dash").await.unwrap();
    assert_eq!(transport.requests().len(), 2);

    let set = plugin.actions_for(&RouteKey::from("/dash")).unwrap();
    let stats = set.fetch.as_ref().and_then(|f| f.get("stats")).unwrap().clone();
    let release = transport.hold("https://api/stats");
    let mut call = tokio_test::task::spawn(stats.call());
    assert_pending!(call.poll());

    let state = plugin.state_for(&RouteKey::from("/dash")).unwrap();
    assert_eq!(state.fetching.get_named("stats"), Some(true));
    assert_eq!(state.fetching.get_named("feed"), Some(false));
    assert!(!state.pending.get());

    release.send(FetchResponse::new(200, "null")).unwrap();
    assert_eq!(assert_ready!(call.poll()).unwrap(), Value::Null);
    assert_eq!(state.data.get_named("stats"), Some(Some(Value::Null)));
}

#[tokio::test]
async fn test_abandoned_navigation_settles_state() {
    let (transport, plugin) = setup(NavigationMode::Await, RequestOptions::new());
    let guard = plugin.guard();
    let route = Route::new("/foos/7")
        .with_matched("/foos/:id")
        .with_param("id", "7")
        .with_fetch(FetchSpec::url("https://api/foos/:id"));
    let _release = transport.hold("https://api/foos/7");

    let mut navigation = tokio_test::task::spawn(guard.before_each(&route));
    assert_pending!(navigation.poll());

    let state = plugin.state_for(&route.key()).unwrap();
    assert_eq!(state.fetching.get(), Some(true));
    assert!(state.pending.get());

    drop(navigation);
    assert_eq!(state.fetching.get(), Some(false));
    assert!(!state.pending.get());
    assert_eq!(state.data.get(), Some(None));

    guard.before_each(&route).await.unwrap();
    assert_eq!(state.data.get(), Some(Some(json!({"url": "https://api/foos/7"}))));
    assert!(!state.pending.get());
}

#[tokio::test]
async fn test_navigation_timeout_releases_flags() {
    let (transport, plugin) = setup(NavigationMode::Await, RequestOptions::new());
    let mut router = foos_router(&plugin);
    let _release = transport.hold("https://api/foos/3");

    let outcome = timeout(Duration::from_millis(20), router.push("/foos/3")).await;
    assert!(outcome.is_err());

    let state = plugin.state_for(&RouteKey::from("/foos/:id")).unwrap();
    assert_eq!(state.fetching.get(), Some(false));
    assert!(!state.pending.get());

    router.push("/foos/4").await.unwrap();
    assert_eq!(state.data.get(), Some(Some(json!({"url": "https://api/foos/4"}))));
    assert!(!state.pending.get());
}
