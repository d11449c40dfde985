//! 通过真实 HTTP 连接验证传输层：401 刷新重试、SSE 分块解码

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::StreamExt;
use serde_json::{json, Value};

use novelist::application::ports::{
    ApiError, ChapterWriteRequest, GenerationOptions, GenerationPort, NovelRepositoryPort,
    TokenStorePort, TransportPort,
};
use novelist::domain::generation::{AgentEvent, StageTranscript, StatusUpdate};
use novelist::infrastructure::adapters::{
    HttpGenerationApi, HttpNovelRepository, ReqwestTransport, ReqwestTransportConfig,
};
use novelist::infrastructure::http::{ApiClient, RefreshCoordinator};
use novelist::infrastructure::memory::InMemoryTokenStore;

#[derive(Clone, Default)]
struct Backend {
    refreshes: Arc<AtomicUsize>,
    refresh_rejects: bool,
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn list_novels(headers: HeaderMap) -> Response {
    if bearer(&headers) != Some("fresh") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Token expired"})),
        )
            .into_response();
    }
    Json(json!([{"id": "n1", "title": "Harbor Lights"}])).into_response()
}

async fn refresh(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    backend.refreshes.fetch_add(1, Ordering::SeqCst);
    // 让并发请求都在刷新进行中到达
    tokio::time::sleep(Duration::from_millis(150)).await;

    if backend.refresh_rejects || body["refresh_token"] != "r1" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid refresh token"})),
        )
            .into_response();
    }
    Json(json!({"access_token": "fresh", "refresh_token": "r2"})).into_response()
}

async fn write_stream(headers: HeaderMap) -> Response {
    if bearer(&headers) != Some("fresh") {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    // 帧边界故意落在分块中间
    let chunks = vec![
        "event: status\ndata: {\"stage\": \"draft\", \"attempt\": 1, \"max_",
        "attempts\": 3}\n\nevent: chunk\ndata: {\"stage\": \"draft\", \"content\": \"The tide \"}\n",
        "\nevent: chunk\ndata: {\"stage\": \"draft\", \"content\": \"turned.\"}\n\n",
        "event: status\ndata: {\"status\": \"saved\", \"chapter_id\": \"c1\"}\n\nevent: done\ndata: {\"score\": 8.5}\n\n",
    ];
    let body = futures_util::stream::iter(
        chunks
            .into_iter()
            .map(|c| Ok::<_, std::convert::Infallible>(Bytes::from_static(c.as_bytes()))),
    );
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(Body::from_stream(body))
        .unwrap()
}

async fn spawn_backend(backend: Backend) -> SocketAddr {
    let app = Router::new()
        .route("/api/novels", get(list_novels))
        .route("/api/auth/refresh", post(refresh))
        .route(
            "/api/novels/n1/chapters/c1/write/stream",
            post(write_stream),
        )
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_for(addr: SocketAddr, store: Arc<InMemoryTokenStore>) -> ApiClient {
    let transport: Arc<dyn TransportPort> = Arc::new(
        ReqwestTransport::new(ReqwestTransportConfig {
            base_url: format!("http://{}/api", addr),
            timeout_secs: 5,
            connect_timeout_secs: 2,
        })
        .unwrap(),
    );
    let refresher = Arc::new(RefreshCoordinator::new(transport.clone(), store));
    ApiClient::new(transport, refresher)
}

#[tokio::test]
async fn test_stale_token_is_refreshed_once_for_concurrent_requests() {
    let backend = Backend::default();
    let addr = spawn_backend(backend.clone()).await;
    let store = Arc::new(InMemoryTokenStore::new());
    store.set_tokens("stale", "r1").unwrap();
    let repo = HttpNovelRepository::new(client_for(addr, store.clone()));

    let (first, second) = tokio::join!(repo.list_novels(), repo.list_novels());

    assert_eq!(first.unwrap()[0].title, "Harbor Lights");
    assert_eq!(second.unwrap()[0].id, "n1");
    assert_eq!(backend.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(store.access_token().unwrap().as_deref(), Some("fresh"));
    assert_eq!(store.refresh_token().unwrap().as_deref(), Some("r2"));
}

#[tokio::test]
async fn test_rejected_refresh_expires_session() {
    let backend = Backend {
        refresh_rejects: true,
        ..Backend::default()
    };
    let addr = spawn_backend(backend.clone()).await;
    let store = Arc::new(InMemoryTokenStore::new());
    store.set_tokens("stale", "r1").unwrap();
    let repo = HttpNovelRepository::new(client_for(addr, store.clone()));

    let err = repo.list_novels().await.unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired));
    assert!(store.access_token().unwrap().is_none());
    assert!(store.refresh_token().unwrap().is_none());
}

#[tokio::test]
async fn test_chapter_stream_decodes_split_frames() {
    let addr = spawn_backend(Backend::default()).await;
    let store = Arc::new(InMemoryTokenStore::new());
    store.set_tokens("fresh", "r1").unwrap();
    let generation = HttpGenerationApi::new(client_for(addr, store));

    let request = ChapterWriteRequest {
        options: GenerationOptions {
            provider: Some("claude".to_string()),
            prompt: None,
        },
        max_attempts: Some(3),
    };
    let events: Vec<AgentEvent> = generation
        .stream_chapter("n1", "c1", &request)
        .await
        .unwrap()
        .map(|e| e.unwrap())
        .collect()
        .await;

    assert_eq!(events.len(), 5);
    assert!(matches!(
        &events[0],
        AgentEvent::Status(StatusUpdate::Progress { attempt: Some(1), max_attempts: Some(3), .. })
    ));
    assert!(matches!(
        &events[3],
        AgentEvent::Status(StatusUpdate::Saved { chapter_id }) if chapter_id == "c1"
    ));
    assert_eq!(events[4], AgentEvent::Done { score: Some(8.5) });

    let mut transcript = StageTranscript::default();
    for event in &events {
        transcript.apply(event);
    }
    assert_eq!(transcript.text("draft"), Some("The tide turned."));
}
