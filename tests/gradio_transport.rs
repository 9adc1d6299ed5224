use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use janusgen::{
    Credentials, FsSaveTarget, GenerationError, GenerationRequest, GenerationSession,
    GradioConnector, HttpImageFetcher, InferenceConnector, InferenceSession, PredictionParams,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

const COMPLETE_EVENTS: &str = "event: heartbeat\ndata: null\n\n\
event: generating\ndata: []\n\n\
event: complete\ndata: [[{\"image\":{\"url\":\"{base}/file/1.webp\"},\"caption\":null},{\"image\":{\"url\":\"{base}/file/2.webp\"},\"caption\":null}]]\n\n";

const ERROR_EVENTS: &str = "event: heartbeat\ndata: null\n\n\
event: error\ndata: \"CUDA out of memory\"\n\n";

const TRUNCATED_EVENTS: &str = "event: heartbeat\ndata: null\n\n";

#[derive(Debug, Clone)]
struct Seen {
    request: String,
    auth: Option<String>,
    body: Option<Value>,
}

#[derive(Clone)]
struct FakeSpace {
    base: String,
    api_prefix: Option<&'static str>,
    events: Arc<str>,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl FakeSpace {
    fn record(&self, method: &Method, uri: &Uri, headers: &HeaderMap, body: Option<Value>) {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        self.seen.lock().unwrap().push(Seen {
            request: format!("{} {}", method, uri.path()),
            auth,
            body,
        });
    }

    fn requests(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.request.clone())
            .collect()
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

async fn host(
    State(space): State<FakeSpace>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Json<Value> {
    space.record(&method, &uri, &headers, None);
    Json(json!({"subdomain": "owner-janus", "host": space.base}))
}

async fn config(
    State(space): State<FakeSpace>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Json<Value> {
    space.record(&method, &uri, &headers, None);
    match space.api_prefix {
        Some(prefix) => Json(json!({"version": "5.12.0", "api_prefix": prefix})),
        None => Json(json!({"version": "4.44.1"})),
    }
}

async fn info(
    State(space): State<FakeSpace>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Json<Value> {
    space.record(&method, &uri, &headers, None);
    Json(json!({
        "named_endpoints": {
            "/generate_image": {
                "parameters": [
                    {"label": "Prompt", "parameter_name": "prompt", "parameter_has_default": false},
                    {"label": "Seed", "parameter_name": "seed", "parameter_has_default": true, "parameter_default": 12345},
                    {"label": "CFG Weight", "parameter_name": "guidance", "parameter_has_default": true, "parameter_default": 5},
                    {"label": "temperature", "parameter_name": "t2i_temperature", "parameter_has_default": true, "parameter_default": 1}
                ]
            }
        },
        "unnamed_endpoints": {}
    }))
}

async fn start_call(
    State(space): State<FakeSpace>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    space.record(&method, &uri, &headers, Some(body));
    Json(json!({"event_id": "evt-1"}))
}

async fn result_stream(
    State(space): State<FakeSpace>,
    Path(event_id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    space.record(&method, &uri, &headers, None);
    if event_id != "evt-1" {
        return (StatusCode::NOT_FOUND, "unknown event").into_response();
    }
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        space.events.to_string(),
    )
        .into_response()
}

async fn file(
    State(space): State<FakeSpace>,
    Path(name): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    space.record(&method, &uri, &headers, None);
    if name == "missing.webp" {
        return (StatusCode::NOT_FOUND, "gone").into_response();
    }
    format!("webp:{}", name).into_bytes().into_response()
}

/// Serve a fake Gradio app on an ephemeral port. `{base}` in `events` is
/// replaced with the app's own address.
async fn spawn_space(api_prefix: Option<&'static str>, events: &str) -> FakeSpace {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let space = FakeSpace {
        events: Arc::from(events.replace("{base}", &base)),
        base,
        api_prefix,
        seen: Arc::new(Mutex::new(Vec::new())),
    };

    let prefix = api_prefix.unwrap_or("");
    let app = Router::new()
        .route("/api/spaces/{owner}/{name}/host", get(host))
        .route("/config", get(config))
        .route(&format!("{}/info", prefix), get(info))
        .route(&format!("{}/call/generate_image", prefix), post(start_call))
        .route(
            &format!("{}/call/generate_image/{{event_id}}", prefix),
            get(result_stream),
        )
        .route("/file/{name}", get(file))
        .with_state(space.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    space
}

fn fox_params() -> PredictionParams {
    GenerationRequest::new("a red fox in snow")
        .with_seed(42)
        .with_guidance(7.0)
        .with_temperature(0.5)
        .to_params()
        .unwrap()
}

async fn connect(
    space: &FakeSpace,
    endpoint: &str,
    credentials: Credentials,
) -> Box<dyn InferenceSession> {
    match GradioConnector::new(&space.base)
        .connect(endpoint, &credentials)
        .await
    {
        Ok(session) => session,
        Err(e) => panic!("connect failed: {}", e),
    }
}

#[tokio::test]
async fn test_prefixed_api_via_host_lookup() {
    let space = spawn_space(Some("/gradio_api"), COMPLETE_EVENTS).await;
    let session = connect(&space, "owner/janus", Credentials::with_token("hf_test")).await;

    let response = session.invoke("/generate_image", fox_params()).await.unwrap();

    assert_eq!(response.data.len(), 1);
    assert_eq!(
        response.data[0][1]["image"]["url"],
        json!(format!("{}/file/2.webp", space.base))
    );
    assert_eq!(
        space.requests(),
        vec![
            "GET /api/spaces/owner/janus/host",
            "GET /config",
            "GET /gradio_api/info",
            "POST /gradio_api/call/generate_image",
            "GET /gradio_api/call/generate_image/evt-1",
        ]
    );

    let seen = space.seen();
    assert!(seen
        .iter()
        .all(|s| s.auth.as_deref() == Some("Bearer hf_test")));
    assert_eq!(
        seen[3].body,
        Some(json!({"data": ["a red fox in snow", 42, 7.0, 0.5]}))
    );
}

#[tokio::test]
async fn test_root_api_with_direct_url_and_no_token() {
    let space = spawn_space(None, COMPLETE_EVENTS).await;
    let session = connect(&space, &format!("{}/", space.base), Credentials::anonymous()).await;

    let response = session.invoke("generate_image", fox_params()).await.unwrap();

    assert_eq!(response.data[0].as_array().map(|a| a.len()), Some(2));
    assert_eq!(
        space.requests(),
        vec![
            "GET /config",
            "GET /info",
            "POST /call/generate_image",
            "GET /call/generate_image/evt-1",
        ]
    );
    assert!(space.seen().iter().all(|s| s.auth.is_none()));
}

#[tokio::test]
async fn test_error_event_is_invocation_error() {
    let space = spawn_space(Some("/gradio_api"), ERROR_EVENTS).await;
    let session = connect(&space, &space.base, Credentials::anonymous()).await;

    let err = session
        .invoke("/generate_image", fox_params())
        .await
        .unwrap_err();

    assert!(
        matches!(err, GenerationError::Invocation(ref m) if m.contains("CUDA out of memory")),
        "unexpected error: {}",
        err
    );
}

#[tokio::test]
async fn test_stream_closing_without_complete_is_invocation_error() {
    let space = spawn_space(Some("/gradio_api"), TRUNCATED_EVENTS).await;
    let session = connect(&space, &space.base, Credentials::anonymous()).await;

    let err = session
        .invoke("/generate_image", fox_params())
        .await
        .unwrap_err();

    assert!(
        matches!(err, GenerationError::Invocation(ref m) if m.contains("ended before completion")),
        "unexpected error: {}",
        err
    );
}

#[tokio::test]
async fn test_session_generates_and_downloads_over_http() {
    let space = spawn_space(Some("/gradio_api"), COMPLETE_EVENTS).await;
    let dir = std::env::temp_dir().join(format!("janusgen-e2e-{}", uuid::Uuid::new_v4()));

    let session = GenerationSession::new(
        Arc::new(GradioConnector::new(&space.base)),
        Arc::new(HttpImageFetcher::new()),
        Arc::new(FsSaveTarget::new(&dir)),
    )
    .with_endpoint(space.base.clone(), Credentials::with_token("hf_test"));
    session.set_prompt("a red fox in snow");

    let result = session.submit().await.unwrap();
    assert_eq!(result.len(), 2);
    let state = session.state();
    assert!(!state.loading);
    assert!(state.error.is_none());

    let url = state.generated_images[1].url.clone();
    let path = session.download_image(&url, 1).await.unwrap();
    assert_eq!(path, dir.join("generated-image-2.webp"));
    assert_eq!(tokio::fs::read(&path).await.unwrap(), b"webp:2.webp");

    let file_request = space
        .seen()
        .into_iter()
        .find(|s| s.request == "GET /file/2.webp")
        .unwrap();
    assert!(file_request.auth.is_none());

    let missing = format!("{}/file/missing.webp", space.base);
    assert!(session.download_image(&missing, 2).await.is_err());
    assert_eq!(
        session.state().error.as_deref(),
        Some("Failed to download image. Please try again.")
    );
    assert!(!dir.join("generated-image-3.webp").exists());

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}
