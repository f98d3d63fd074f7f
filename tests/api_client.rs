mod common;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use authed_http::{
    ApiClient, Error, ErrorKind, FileTokenProvider, Request, RequestOptions, TokenPair,
    TokenProvider,
};

use common::{
    REFRESH_PATH, config, envelope, expired, init_logging, memory_tokens, mount_protected,
    refresh_ok,
};

#[derive(Debug, Deserialize, PartialEq)]
struct Post {
    id: u64,
    title: String,
}

#[derive(Serialize)]
struct NewPost<'a> {
    title: &'a str,
}

#[tokio::test]
async fn typed_verbs_unwrap_envelopes() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(200, "ok", json!({"id": 1, "title": "first"}))),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/posts"))
        .and(body_json(json!({"title": "second"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(200, "created", json!({"id": 2, "title": "second"}))),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/posts/2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(200, "deleted", json!(null))),
        )
        .mount(&server)
        .await;

    let (_tokens, provider) = memory_tokens("a1", "r1");
    let client = ApiClient::new(config(&server), provider).expect("valid config");

    let post: Post = client.get("/posts/1").await.expect("get");
    assert_eq!(post, Post { id: 1, title: "first".into() });

    let created: Post = client
        .post("/posts", &NewPost { title: "second" })
        .await
        .expect("post");
    assert_eq!(created.id, 2);

    let deleted: Option<Post> = client.delete("/posts/2").await.expect("delete");
    assert_eq!(deleted, None);
}

#[tokio::test]
async fn custom_ok_codes_and_rejections() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/profile"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(0, "", json!({"id": 5, "title": "me"}))),
        )
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(4001, "", json!(null))))
        .mount(&server)
        .await;

    let (_tokens, provider) = memory_tokens("a1", "r1");
    let client = ApiClient::new(config(&server), provider)
        .expect("valid config")
        .with_ok_codes([0_i64, 200]);

    let updated: Post = client
        .put("/profile", &json!({"title": "me"}))
        .await
        .expect("code 0 accepted");
    assert_eq!(updated.id, 5);

    let err = client
        .patch::<_, Post>("/profile", &json!({}))
        .await
        .expect_err("code 4001 rejected");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.status(), None);
    assert_eq!(err.message(), "request failed");
}

#[tokio::test]
async fn refresh_accepts_the_client_ok_codes() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(expired())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("Authorization", "Bearer a2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(0, "", json!("ada"))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(0, "", json!({"token": "a2"}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (tokens, provider) = memory_tokens("a1", "r1");
    let client = ApiClient::new(config(&server), provider)
        .expect("valid config")
        .with_ok_codes([0_i64]);

    let name: String = client.get("/me").await.expect("retried after refresh");
    assert_eq!(name, "ada");
    assert_eq!(tokens.access_token().as_deref(), Some("a2"));
    assert_eq!(tokens.refresh_token().as_deref(), Some("r1"));
}

#[tokio::test]
async fn send_honours_per_call_options() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/raw"))
        .and(header("X-Trace", "t-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"code": 7, "data": "seven"})),
        )
        .mount(&server)
        .await;

    let (_tokens, provider) = memory_tokens("a1", "r1");
    let client = ApiClient::new(config(&server), provider).expect("valid config");

    let seven: String = client
        .send(
            Request::get("/raw").with_header("X-Trace", "t-1"),
            RequestOptions::new().ok_codes(7_i64),
        )
        .await
        .expect("code 7 accepted for this call");
    assert_eq!(seven, "seven");
}

#[tokio::test]
async fn mismatched_payload_is_a_json_error() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(200, "ok", json!("not a post"))),
        )
        .mount(&server)
        .await;

    let (_tokens, provider) = memory_tokens("a1", "r1");
    let client = ApiClient::new(config(&server), provider).expect("valid config");
    let err = client.get::<Post>("/posts/1").await.expect_err("shape mismatch");
    assert!(matches!(err, Error::Json(_)), "got {err:?}");
}

#[tokio::test]
async fn refreshed_tokens_are_persisted_to_disk() {
    init_logging();
    let server = MockServer::start().await;
    mount_protected(
        &server,
        "/posts/1",
        "a1",
        "a2",
        json!({"id": 1, "title": "first"}),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(refresh_ok("a2", Some("r2")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let token_path = dir.path().join("tokens.json");
    std::fs::write(
        &token_path,
        serde_json::to_string(&TokenPair::new("a1", "r1")).expect("serialize"),
    )
    .expect("seed token file");

    let provider: Arc<dyn TokenProvider> = Arc::new(FileTokenProvider::open(&token_path));
    let client = ApiClient::new(config(&server), provider).expect("valid config");
    let post: Post = client.get("/posts/1").await.expect("retried after refresh");
    assert_eq!(post.title, "first");

    let reopened = FileTokenProvider::open(&token_path);
    assert_eq!(reopened.access_token().as_deref(), Some("a2"));
    assert_eq!(reopened.refresh_token().as_deref(), Some("r2"));
}

#[tokio::test]
async fn sign_out_drops_credentials() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(200, "ok", json!([]))))
        .mount(&server)
        .await;

    let (tokens, provider) = memory_tokens("a1", "r1");
    let client = ApiClient::new(config(&server), provider).expect("valid config");
    client.sign_out();
    assert_eq!(tokens.access_token(), None);
    assert_eq!(client.tokens().refresh_token(), None);

    let _: Vec<u64> = client.get("/public").await.expect("anonymous call");
    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests[0].headers.get("Authorization").is_none());
}
