//! Compare session tests
//!
//! Three providers per turn against simulated upstreams, in-process and over HTTP

use futures::StreamExt;
use httpmock::prelude::*;
use modelcompare::config::{AppConfig, Settings};
use modelcompare::handlers::create_router;
use modelcompare::models::{ChatMessage, ProviderId, Role, StreamEvent};
use modelcompare::services::{
    CompareSession, ConversationStore, Dispatcher, MemoryStore, PaneOutcome, RemoteChatClient, ERROR_REPLY,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn create_test_settings() -> Settings {
    let vars: HashMap<&str, &str> = [
        ("DOUBAO_API_KEY", "ark-key"),
        ("DEEPSEEK_API_KEY", "sk-deepseek"),
        ("WENXIN_API_KEY", "wenxin-ak"),
        ("WENXIN_SECRET_KEY", "wenxin-sk"),
    ]
    .into_iter()
    .collect();

    Settings::from_source(|k| vars.get(k).map(|v| v.to_string())).unwrap()
}

/// Doubao and Wenxin answer at once; DeepSeek fails after `deepseek_delay`
async fn mock_upstreams(server: &MockServer, deepseek_delay: Duration) {
    server
        .mock_async(|when, then| {
            when.method(POST).path("/doubao/chat/completions");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(concat!(
                    "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
                    "data: {\"choices\":[{\"delta\":{\"content\":\" from doubao\"}}]}\n\n",
                    "data: [DONE]\n\n",
                ));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/deepseek/chat/completions");
            then.status(500)
                .delay(deepseek_delay)
                .json_body(json!({"error": {"message": "overloaded"}}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/oauth/2.0/token");
            then.status(200).json_body(json!({"access_token": "tok"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/wenxin/chat/completions")
                .query_param("access_token", "tok");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body("data: {\"result\":\"嗨\"}\n\ndata: {\"result\":\"，你好\"}\n\n");
        })
        .await;
}

fn dispatcher(server: &MockServer) -> Dispatcher {
    Dispatcher::new(create_test_settings(), &AppConfig::with_base_url(&server.base_url())).unwrap()
}

async fn collect_timed(dispatcher: &Dispatcher, provider: ProviderId, started: Instant) -> (Vec<StreamEvent>, Duration) {
    let messages = vec![ChatMessage::user("hi")];
    let events: Vec<StreamEvent> = dispatcher.open_events(provider, &messages).await.collect().await;
    (events, started.elapsed())
}

#[tokio::test]
async fn test_failure_in_one_provider_does_not_delay_others() {
    let server = MockServer::start_async().await;
    mock_upstreams(&server, Duration::from_millis(1500)).await;
    let dispatcher = dispatcher(&server);

    let started = Instant::now();
    let ((a, a_took), (b, b_took), (c, c_took)) = tokio::join!(
        collect_timed(&dispatcher, ProviderId::Doubao, started),
        collect_timed(&dispatcher, ProviderId::DeepSeek, started),
        collect_timed(&dispatcher, ProviderId::Wenxin, started),
    );

    assert_eq!(
        a,
        vec![
            StreamEvent::TokenFragment("Hello".to_string()),
            StreamEvent::TokenFragment(" from doubao".to_string()),
            StreamEvent::End,
        ]
    );
    assert_eq!(
        c,
        vec![
            StreamEvent::TokenFragment("嗨".to_string()),
            StreamEvent::TokenFragment("，你好".to_string()),
            StreamEvent::End,
        ]
    );

    assert_eq!(b.len(), 1);
    assert!(matches!(&b[0], StreamEvent::Error(m) if m.contains("500") && m.contains("overloaded")));

    assert!(b_took >= Duration::from_millis(1500));
    assert!(a_took < Duration::from_millis(1000), "doubao took {:?}", a_took);
    assert!(c_took < Duration::from_millis(1000), "wenxin took {:?}", c_took);
}

#[tokio::test]
async fn test_session_turn_with_one_failing_pane() {
    let server = MockServer::start_async().await;
    mock_upstreams(&server, Duration::ZERO).await;

    let store = Arc::new(MemoryStore::new());
    let mut session = CompareSession::new(Arc::new(dispatcher(&server)), store.clone());

    let summary = session.send("hi").await.unwrap();

    assert_eq!(
        summary.outcome(ProviderId::Doubao),
        &PaneOutcome::Completed { content: "Hello from doubao".to_string() }
    );
    assert_eq!(
        summary.outcome(ProviderId::Wenxin),
        &PaneOutcome::Completed { content: "嗨，你好".to_string() }
    );
    assert!(!summary.outcome(ProviderId::DeepSeek).is_completed());

    let deepseek = session.pane(ProviderId::DeepSeek);
    assert_eq!(deepseek.messages, vec![ChatMessage::user("hi"), ChatMessage::assistant(ERROR_REPLY)]);
    assert!(deepseek.streaming_content.is_empty());
    assert!(!session.is_busy());

    // user message plus the two successful replies
    let recorded = store.messages(&summary.conversation_id).await.unwrap();
    assert_eq!(recorded.len(), 3);
    assert_eq!(recorded[0].role, Role::User);
    assert!(recorded[1..].iter().all(|m| m.role == Role::Assistant));
    assert!(recorded.iter().all(|m| m.provider != Some(ProviderId::DeepSeek)));
}

#[tokio::test]
async fn test_session_keeps_conversation_across_turns() {
    let server = MockServer::start_async().await;
    mock_upstreams(&server, Duration::ZERO).await;

    let mut session = CompareSession::new(Arc::new(dispatcher(&server)), Arc::new(MemoryStore::new()));

    let first = session.send("hi").await.unwrap();
    let second = session.send("again").await.unwrap();
    assert_eq!(first.conversation_id, second.conversation_id);

    let doubao = session.pane(ProviderId::Doubao);
    assert_eq!(doubao.messages.len(), 4);
    assert_eq!(doubao.messages[2], ChatMessage::user("again"));

    session.clear();
    let third = session.send("fresh").await.unwrap();
    assert_ne!(third.conversation_id, first.conversation_id);
    assert_eq!(session.pane(ProviderId::Doubao).messages.len(), 2);
}

#[tokio::test]
async fn test_remote_client_against_live_server() {
    let server = MockServer::start_async().await;
    mock_upstreams(&server, Duration::ZERO).await;

    let app = create_router(create_test_settings(), AppConfig::with_base_url(&server.base_url())).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = RemoteChatClient::new(format!("http://{}", addr), 30).unwrap();
    assert!(client.health_check().await.unwrap());

    let mut session = CompareSession::new(Arc::new(client), Arc::new(MemoryStore::new()));
    let summary = session.send("hi").await.unwrap();

    assert_eq!(
        summary.outcome(ProviderId::Doubao),
        &PaneOutcome::Completed { content: "Hello from doubao".to_string() }
    );
    assert_eq!(
        summary.outcome(ProviderId::Wenxin),
        &PaneOutcome::Completed { content: "嗨，你好".to_string() }
    );
    match summary.outcome(ProviderId::DeepSeek) {
        PaneOutcome::Failed { error } => assert!(error.contains("502"), "unexpected error: {}", error),
        other => panic!("Expected failure, got {:?}", other),
    }
}
