//! Provider adapters against local mock upstreams.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use modelarena::ai::provider::http_client;
use modelarena::ai::{
    ChatAdapter, ProviderAdapter, ProviderOutput, ReplicateAdapter, ThrottlePolicy,
};
use modelarena::config::{EndpointConfig, Model, RetryConfig};
use modelarena::types::{Category, ErrorCategory, OutputKind, Provider};

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

fn serve(listener: TcpListener, app: Router) {
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
}

fn endpoint(base: &str) -> EndpointConfig {
    EndpointConfig {
        api_base: Some(base.to_string()),
        api_key: Some("test-key".to_string()),
    }
}

// =============================================================================
// Chat completions
// =============================================================================

#[derive(Default)]
struct ChatMock {
    calls: AtomicUsize,
    /// Calls answered with 429 before succeeding
    throttle_first: usize,
    last_auth: Mutex<Option<String>>,
    last_body: Mutex<Option<Value>>,
    reply: String,
}

async fn chat_completions(
    State(mock): State<Arc<ChatMock>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let call = mock.calls.fetch_add(1, Ordering::SeqCst);
    *mock.last_auth.lock().unwrap() = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *mock.last_body.lock().unwrap() = Some(body);

    if call < mock.throttle_first {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": {"message": "Rate limit exceeded"}})),
        )
            .into_response();
    }

    Json(json!({
        "choices": [{"message": {"role": "assistant", "content": mock.reply}}]
    }))
    .into_response()
}

async fn chat_upstream(mock: Arc<ChatMock>) -> String {
    let (listener, base) = bind().await;
    serve(
        listener,
        Router::new()
            .route("/chat/completions", post(chat_completions))
            .with_state(mock),
    );
    base
}

fn chat_adapter(provider: Provider, base: &str) -> ChatAdapter {
    ChatAdapter::new(provider, &endpoint(base), http_client(10).unwrap())
}

#[tokio::test]
async fn chat_unwraps_code_fence_for_code_models() {
    let mock = Arc::new(ChatMock {
        reply: "Here you go:\n```html\n<p>hi</p>\n```\nEnjoy".to_string(),
        ..Default::default()
    });
    let base = chat_upstream(mock.clone()).await;
    let adapter = chat_adapter(Provider::OpenRouter, &base);

    let code = Model::new("vendor/coder", "Coder", Provider::OpenRouter, Category::Code);
    let output = adapter.invoke(&code, "make a page").await.unwrap();
    assert_eq!(output.kind, OutputKind::Text);
    assert_eq!(output.payload, "<p>hi</p>");

    assert_eq!(
        mock.last_auth.lock().unwrap().as_deref(),
        Some("Bearer test-key")
    );
    let sent = mock.last_body.lock().unwrap().clone().unwrap();
    assert_eq!(sent["model"], "vendor/coder");
    assert_eq!(sent["messages"][0]["role"], "user");
    assert_eq!(sent["messages"][0]["content"], "make a page");
}

#[tokio::test]
async fn chat_keeps_ascii_text_verbatim() {
    let reply = "```\n /\\_/\\\n( o.o )\n```";
    let mock = Arc::new(ChatMock {
        reply: reply.to_string(),
        ..Default::default()
    });
    let base = chat_upstream(mock).await;
    let adapter = chat_adapter(Provider::OpenAi, &base);

    let ascii = Model::new("gpt-4.1", "GPT-4.1", Provider::OpenAi, Category::Ascii);
    let output = adapter.invoke(&ascii, "draw a cat").await.unwrap();
    assert_eq!(output.payload, reply);
}

#[tokio::test]
async fn chat_throttle_is_rate_limit() {
    let mock = Arc::new(ChatMock {
        throttle_first: usize::MAX,
        ..Default::default()
    });
    let base = chat_upstream(mock).await;
    let adapter = chat_adapter(Provider::OpenRouter, &base);
    let model = Model::new("vendor/m", "M", Provider::OpenRouter, Category::Ascii);

    let err = adapter.invoke(&model, "hi").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::RateLimit);
    assert_eq!(err.message, "Rate limit exceeded");
}

#[tokio::test]
async fn chat_retry_after_header_is_read() {
    async fn limited() -> impl IntoResponse {
        (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "7")],
            "slow down",
        )
    }

    let (listener, base) = bind().await;
    serve(listener, Router::new().route("/chat/completions", post(limited)));
    let adapter = chat_adapter(Provider::OpenRouter, &base);
    let model = Model::new("vendor/m", "M", Provider::OpenRouter, Category::Code);

    let err = adapter.invoke(&model, "hi").await.unwrap_err();
    assert!(err.is_throttled());
    assert_eq!(err.retry_after, Some(Duration::from_secs(7)));
}

#[tokio::test]
async fn chat_single_throttle_retried_once() {
    let mock = Arc::new(ChatMock {
        throttle_first: 1,
        reply: "ok".to_string(),
        ..Default::default()
    });
    let base = chat_upstream(mock.clone()).await;
    let adapter = chat_adapter(Provider::OpenRouter, &base);
    let model = Model::new("vendor/m", "M", Provider::OpenRouter, Category::Ascii);

    let policy = ThrottlePolicy::new(Duration::from_millis(20), Duration::ZERO);
    let output = policy
        .run("vendor/m", || adapter.invoke(&model, "hi"))
        .await
        .unwrap();

    assert_eq!(output.payload, "ok");
    assert_eq!(mock.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn chat_double_throttle_fails_after_two_attempts() {
    let mock = Arc::new(ChatMock {
        throttle_first: usize::MAX,
        ..Default::default()
    });
    let base = chat_upstream(mock.clone()).await;
    let adapter = chat_adapter(Provider::OpenRouter, &base);
    let model = Model::new("vendor/m", "M", Provider::OpenRouter, Category::Ascii);

    let policy = ThrottlePolicy::new(Duration::from_millis(20), Duration::ZERO);
    let err = policy
        .run("vendor/m", || adapter.invoke(&model, "hi"))
        .await
        .unwrap_err();

    assert!(err.is_throttled());
    assert_eq!(mock.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn chat_auth_failure_classified() {
    async fn unauthorized() -> impl IntoResponse {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"message": "Invalid API key"}})),
        )
    }

    let (listener, base) = bind().await;
    serve(listener, Router::new().route("/chat/completions", post(unauthorized)));
    let adapter = chat_adapter(Provider::OpenAi, &base);
    let model = Model::new("gpt-4.1", "GPT", Provider::OpenAi, Category::Code);

    let err = adapter.invoke(&model, "hi").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::Auth);
    assert_eq!(err.message, "Invalid API key");
}

#[tokio::test]
async fn chat_missing_content_is_empty_text() {
    let replies = [
        json!({"choices": [{"message": {"role": "assistant"}}]}),
        json!({"choices": [{"message": {"role": "assistant", "content": null}}]}),
        json!({"choices": []}),
    ];

    for reply in replies {
        let (listener, base) = bind().await;
        let app = Router::new().route(
            "/chat/completions",
            post(move || {
                let reply = reply.clone();
                async move { Json(reply) }
            }),
        );
        serve(listener, app);

        let adapter = chat_adapter(Provider::OpenRouter, &base);
        for category in [Category::Code, Category::Ascii] {
            let model = Model::new("vendor/quiet", "Quiet", Provider::OpenRouter, category);
            let output = adapter.invoke(&model, "hi").await.unwrap();
            assert_eq!(output, ProviderOutput::text(""));
        }
    }
}

// =============================================================================
// Replicate predictions
// =============================================================================

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

struct ReplicateMock {
    base: String,
    /// Body of the create-prediction response
    create: Value,
    /// Bodies of successive poll responses (last one repeats)
    polls: Vec<Value>,
    poll_calls: AtomicUsize,
    last_create: Mutex<Option<(String, Value)>>,
}

impl ReplicateMock {
    fn new(base: &str, create: Value, polls: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            base: base.to_string(),
            create,
            polls,
            poll_calls: AtomicUsize::new(0),
            last_create: Mutex::new(None),
        })
    }
}

async fn create_for_model(
    State(mock): State<Arc<ReplicateMock>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let prefer = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    *mock.last_create.lock().unwrap() = Some((prefer, body));
    Json(mock.create.clone())
}

async fn poll_prediction(State(mock): State<Arc<ReplicateMock>>) -> Json<Value> {
    let call = mock.poll_calls.fetch_add(1, Ordering::SeqCst);
    let index = call.min(mock.polls.len().saturating_sub(1));
    Json(mock.polls.get(index).cloned().unwrap_or(Value::Null))
}

async fn image_file() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES)
}

fn replicate_router(mock: Arc<ReplicateMock>) -> Router {
    Router::new()
        .route("/models/:owner/:name/predictions", post(create_for_model))
        .route("/predictions", post(create_for_model))
        .route("/predictions/p1", get(poll_prediction))
        .route("/files/out.png", get(image_file))
        .with_state(mock)
}

fn replicate_adapter(base: &str) -> ReplicateAdapter {
    let retry = RetryConfig {
        poll_interval_ms: 10,
        max_polls: 5,
        ..Default::default()
    };
    ReplicateAdapter::new(&endpoint(base), http_client(10).unwrap(), &retry)
}

fn image_model(id: &str) -> Model {
    Model::new(id, "Image", Provider::Replicate, Category::Image)
}

#[tokio::test]
async fn replicate_output_url_becomes_data_uri() {
    let (listener, base) = bind().await;
    let mock = ReplicateMock::new(
        &base,
        json!({"status": "succeeded", "output": [format!("{}/files/out.png", base)]}),
        vec![],
    );
    serve(listener, replicate_router(mock.clone()));

    let output = replicate_adapter(&mock.base)
        .invoke(&image_model("black-forest-labs/flux-schnell"), "a fox")
        .await
        .unwrap();

    assert_eq!(output.kind, OutputKind::Image);
    assert_eq!(output.payload, "data:image/png;base64,iVBORw0KGgo=");

    let (prefer, body) = mock.last_create.lock().unwrap().clone().unwrap();
    assert_eq!(prefer, "wait");
    assert_eq!(body["input"]["prompt"], "a fox");
    assert_eq!(body["input"]["aspect_ratio"], "1:1");
    assert!(body.get("version").is_none());
}

#[tokio::test]
async fn replicate_versioned_model_uses_predictions_endpoint() {
    let (listener, base) = bind().await;
    let mock = ReplicateMock::new(
        &base,
        json!({"status": "succeeded", "output": "data:image/jpeg;base64,AAAA"}),
        vec![],
    );
    serve(listener, replicate_router(mock.clone()));

    let output = replicate_adapter(&base)
        .invoke(&image_model("owner/sdxl:abc123"), "a fox")
        .await
        .unwrap();

    assert_eq!(output.payload, "data:image/jpeg;base64,AAAA");
    let (_, body) = mock.last_create.lock().unwrap().clone().unwrap();
    assert_eq!(body["version"], "abc123");
}

#[tokio::test]
async fn replicate_polls_until_ready() {
    let (listener, base) = bind().await;
    let mock = ReplicateMock::new(
        &base,
        json!({"status": "starting", "urls": {"get": format!("{}/predictions/p1", base)}}),
        vec![
            json!({"status": "processing", "urls": {"get": format!("{}/predictions/p1", base)}}),
            json!({"status": "succeeded", "output": ["data:image/webp;base64,UklG"]}),
        ],
    );
    serve(listener, replicate_router(mock.clone()));

    let output = replicate_adapter(&base)
        .invoke(&image_model("owner/model"), "a fox")
        .await
        .unwrap();

    assert_eq!(output.payload, "data:image/webp;base64,UklG");
    assert_eq!(mock.poll_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn replicate_error_field_is_failure() {
    let (listener, base) = bind().await;
    let mock = ReplicateMock::new(
        &base,
        json!({"status": "failed", "error": "NSFW content detected"}),
        vec![],
    );
    serve(listener, replicate_router(mock));

    let err = replicate_adapter(&base)
        .invoke(&image_model("owner/model"), "a fox")
        .await
        .unwrap_err();
    assert_eq!(err.message, "NSFW content detected");
    assert!(!err.is_throttled());
}

#[tokio::test]
async fn replicate_no_output_is_failure() {
    let (listener, base) = bind().await;
    let mock = ReplicateMock::new(&base, json!({"status": "succeeded", "output": null}), vec![]);
    serve(listener, replicate_router(mock));

    let err = replicate_adapter(&base)
        .invoke(&image_model("owner/model"), "a fox")
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::NoOutput);
    assert_eq!(err.message, "no output received");
}

#[tokio::test]
async fn replicate_throttle_carries_retry_hint() {
    async fn throttled() -> impl IntoResponse {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "title": "Request was throttled",
                "detail": "Request was throttled. Expected available in 3 seconds.",
                "retry_after": 3
            })),
        )
    }

    let (listener, base) = bind().await;
    serve(
        listener,
        Router::new().route("/models/:owner/:name/predictions", post(throttled)),
    );

    let err = replicate_adapter(&base)
        .invoke(&image_model("owner/model"), "a fox")
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::RateLimit);
    assert_eq!(err.retry_after, Some(Duration::from_secs(3)));
    assert!(err.message.contains("throttled"));
}

#[derive(Default)]
struct ThrottledPolls {
    creates: AtomicUsize,
    polls: AtomicUsize,
    /// Polls answered with 429 before the prediction succeeds
    throttled: usize,
    base: Mutex<String>,
}

async fn throttled_create(State(mock): State<Arc<ThrottledPolls>>) -> Json<Value> {
    mock.creates.fetch_add(1, Ordering::SeqCst);
    let base = mock.base.lock().unwrap().clone();
    Json(json!({"status": "starting", "urls": {"get": format!("{}/predictions/p1", base)}}))
}

async fn throttled_poll(State(mock): State<Arc<ThrottledPolls>>) -> Response {
    let call = mock.polls.fetch_add(1, Ordering::SeqCst);
    if call < mock.throttled {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"detail": "Request was throttled.", "retry_after": 0})),
        )
            .into_response();
    }
    Json(json!({"status": "succeeded", "output": "data:image/png;base64,AAAA"})).into_response()
}

async fn throttled_poll_upstream(throttled: usize) -> (Arc<ThrottledPolls>, String) {
    let (listener, base) = bind().await;
    let mock = Arc::new(ThrottledPolls {
        throttled,
        base: Mutex::new(base.clone()),
        ..Default::default()
    });
    serve(
        listener,
        Router::new()
            .route("/models/:owner/:name/predictions", post(throttled_create))
            .route("/predictions/p1", get(throttled_poll))
            .with_state(mock.clone()),
    );
    (mock, base)
}

#[tokio::test]
async fn replicate_throttled_poll_waits_within_budget() {
    let (mock, base) = throttled_poll_upstream(2).await;

    let output = replicate_adapter(&base)
        .invoke(&image_model("owner/model"), "a fox")
        .await
        .unwrap();

    assert_eq!(output.payload, "data:image/png;base64,AAAA");
    assert_eq!(mock.creates.load(Ordering::SeqCst), 1);
    assert_eq!(mock.polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn replicate_throttled_polls_never_recreate_prediction() {
    let (mock, base) = throttled_poll_upstream(usize::MAX).await;
    let adapter = replicate_adapter(&base);
    let model = image_model("owner/model");

    let policy = ThrottlePolicy::new(Duration::from_millis(20), Duration::ZERO);
    let err = policy
        .run("owner/model", || adapter.invoke(&model, "a fox"))
        .await
        .unwrap_err();

    assert!(!err.is_throttled());
    assert!(err.message.contains("5 polls"));
    assert_eq!(mock.creates.load(Ordering::SeqCst), 1);
    assert_eq!(mock.polls.load(Ordering::SeqCst), 5);
}
