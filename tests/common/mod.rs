#![allow(dead_code)]

use std::sync::{Arc, Once};

use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use authed_http::{Config, MemoryTokenProvider, RefreshCoordinator, TokenProvider};

pub const REFRESH_PATH: &str = "/auth/refresh";

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

pub fn config(server: &MockServer) -> Config {
    Config::new(server.uri()).with_refresh_path(REFRESH_PATH)
}

pub fn memory_tokens(
    access: &str,
    refresh: &str,
) -> (Arc<MemoryTokenProvider>, Arc<dyn TokenProvider>) {
    let tokens = Arc::new(MemoryTokenProvider::with_tokens(access, refresh));
    let provider: Arc<dyn TokenProvider> = tokens.clone();
    (tokens, provider)
}

pub fn coordinator(
    server: &MockServer,
    access: &str,
    refresh: &str,
) -> (RefreshCoordinator, Arc<MemoryTokenProvider>) {
    let (tokens, provider) = memory_tokens(access, refresh);
    let coordinator = RefreshCoordinator::new(config(server), provider).expect("valid config");
    (coordinator, tokens)
}

pub fn envelope(code: i64, message: &str, data: Value) -> Value {
    json!({"code": code, "message": message, "data": data})
}

pub fn expired() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({"message": "token expired"}))
}

/// `GET route` answers 401 to `stale` and an ok envelope carrying `data` to `fresh`.
pub async fn mount_protected(
    server: &MockServer,
    route: &str,
    stale: &str,
    fresh: &str,
    data: Value,
) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("Authorization", format!("Bearer {stale}").as_str()))
        .respond_with(expired())
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("Authorization", format!("Bearer {fresh}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(200, "ok", data)))
        .mount(server)
        .await;
}

pub fn refresh_ok(token: &str, refresh: Option<&str>) -> ResponseTemplate {
    let data = match refresh {
        Some(refresh) => json!({"token": token, "refresh_token": refresh}),
        None => json!({"token": token}),
    };
    ResponseTemplate::new(200).set_body_json(envelope(200, "ok", data))
}

pub async fn count_requests(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}
