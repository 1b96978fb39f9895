//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceExt;

use selenese_hub::api::{build_router, HubState};
use selenese_hub::browser::{MemoryBrowserFactory, MemoryElement, MemoryPage};
use selenese_hub::config::HubConfig;
use selenese_hub::http::HttpServer;
use selenese_hub::lifecycle::Shutdown;

pub const APP_URL: &str = "http://app.test/";

/// Defaults with short waits so failing waits finish quickly.
pub fn test_config() -> HubConfig {
    let mut config = HubConfig::default();
    config.waits.timeout_ms = 2_000;
    config.waits.interval_ms = 10;
    config.waits.page_load_settle_ms = 20;
    config.queue.base_delay_ms = 5;
    config.queue.max_delay_ms = 20;
    config
}

/// Pages served by the in-memory browser in every test session.
pub fn demo_factory() -> MemoryBrowserFactory {
    MemoryBrowserFactory::new(APP_URL)
        .with_load_steps(2)
        .with_page(
            MemoryPage::new(APP_URL)
                .with_title("Demo Home")
                .with_element(
                    MemoryElement::new("input")
                        .with_id("q")
                        .with_name("query")
                        .with_attribute("placeholder", "Search"),
                )
                .with_element(
                    MemoryElement::new("select")
                        .with_id("lang")
                        .with_option("Rust", "rs")
                        .with_option("Go", "go"),
                )
                .with_element(MemoryElement::new("h1").with_id("heading").with_text("Welcome"))
                .with_element(
                    MemoryElement::new("a")
                        .with_id("next")
                        .with_text("Next")
                        .with_attribute("href", "/next"),
                )
                .with_element(
                    MemoryElement::new("a")
                        .with_id("help")
                        .with_text("Help")
                        .with_attribute("href", "/help")
                        .with_attribute("target", "helpWindow"),
                ),
        )
        .with_page(MemoryPage::new("http://app.test/next").with_title("Next Page"))
        .with_page(MemoryPage::new("http://app.test/help").with_title("Help"))
}

pub struct TestHub {
    pub hub: Arc<HubState>,
    pub app: axum::Router,
    pub shutdown: Shutdown,
}

pub fn start_hub(config: HubConfig) -> TestHub {
    let shutdown = Shutdown::new();
    let hub = Arc::new(HubState::new(&config, Arc::new(demo_factory()), &shutdown));
    let router = Arc::new(build_router(&hub, &config.routing));
    let app = HttpServer::new(&config, router).app();
    TestHub { hub, app, shutdown }
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Drive one request through the app without a socket.
pub async fn send(app: &axum::Router, method: Method, path: &str, body: Option<Value>) -> Reply {
    let mut builder = Request::builder().method(method).uri(path);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Reply { status, headers, body }
}

pub async fn new_session(app: &axum::Router) -> String {
    let reply = send(app, Method::POST, "/hub/session", Some(json!({ "capabilities": { "browserName": "memory" } }))).await;
    assert_eq!(reply.status, StatusCode::OK, "session creation failed: {}", reply.body);
    reply.body["sessionId"].as_str().unwrap().to_string()
}

pub async fn run(app: &axum::Router, session: &str, command: &str, args: &[&str]) -> Reply {
    send(
        app,
        Method::POST,
        &format!("/hub/session/{}/selenium/{}", session, command),
        Some(json!({ "args": args })),
    )
    .await
}

/// Serve the hub on an ephemeral port.
pub async fn spawn_server(config: HubConfig) -> (SocketAddr, TestHub) {
    let shutdown = Shutdown::new();
    let hub = Arc::new(HubState::new(&config, Arc::new(demo_factory()), &shutdown));
    let router = Arc::new(build_router(&hub, &config.routing));
    let server = HttpServer::new(&config, router);
    let app = server.app();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    (addr, TestHub { hub, app, shutdown })
}
