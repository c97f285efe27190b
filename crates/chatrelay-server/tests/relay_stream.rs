//! Relay and client consumer wired together over real sockets.

use std::sync::Arc;

use chatrelay_client::{
    CancellationToken, ChatStreamClient, ClientError, StaticCredentials, StreamCallbacks,
    StreamOutcome,
};
use chatrelay_contracts::ChatMessage;
use chatrelay_server::{RelayState, ServerConfig, relay_router};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn spawn_relay(upstream: &MockServer) -> String {
    let mut config = ServerConfig::default();
    config.upstream.url = format!("{}/v1/chat/completions", upstream.uri());
    config.upstream.api_key = Some("upstream-key".to_string());

    let app = relay_router(Arc::new(RelayState::new(&config).unwrap()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/chat", addr)
}

fn client(endpoint: &str) -> ChatStreamClient {
    ChatStreamClient::new(endpoint, Arc::new(StaticCredentials::new("user-token"))).unwrap()
}

#[tokio::test]
async fn streams_deltas_through_relay() {
    let upstream = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"He\"}}]}\n\n",
        ": keep-alive\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"llo\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream"),
        )
        .expect(1)
        .mount(&upstream)
        .await;
    let endpoint = spawn_relay(&upstream).await;

    let mut reply = String::new();
    let mut deltas = 0;
    let mut done = false;
    let outcome = client(&endpoint)
        .stream_chat(
            &[ChatMessage::user("Say hello")],
            StreamCallbacks::new(|delta| {
                reply.push_str(delta);
                deltas += 1;
            })
            .on_done(|| done = true),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::Completed);
    assert_eq!(reply, "Hello");
    assert_eq!(deltas, 2);
    assert!(done);
}

#[tokio::test]
async fn upstream_rate_limit_reaches_on_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&upstream)
        .await;
    let endpoint = spawn_relay(&upstream).await;

    let mut reply = String::new();
    let mut failure = None;
    let outcome = client(&endpoint)
        .stream_chat(
            &[ChatMessage::user("Hi")],
            StreamCallbacks::new(|delta| reply.push_str(delta)).on_error(|err| failure = Some(err)),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::Failed);
    assert!(reply.is_empty());
    match failure {
        Some(ClientError::RateLimited(message)) => {
            assert_eq!(message, "Rate limits exceeded, please try again later.")
        }
        other => panic!("expected rate limit, got {:?}", other),
    }
}

#[tokio::test]
async fn oversized_conversation_rejected_before_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;
    let endpoint = spawn_relay(&upstream).await;

    let messages: Vec<Value> = (0..51)
        .map(|i| json!({"role": "user", "content": format!("m{i}")}))
        .collect();
    let response = reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
        .post(&endpoint)
        .json(&json!({ "messages": messages }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert_eq!(
        response.text().await.unwrap(),
        r#"{"error":"Too many messages (max 50)"}"#
    );
}
