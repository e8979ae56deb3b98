//! Tests for the Replicate client against an in-process fake Replicate API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use imagecraft_core::error::CoreError;
use imagecraft_core::generation::{generate, GenerationRequest, ImageModel};
use imagecraft_replicate::api::{ReplicateApi, ReplicateApiError};
use imagecraft_replicate::config::ReplicateConfig;
use imagecraft_replicate::model::{ModelRef, ReplicateModel};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Fake server
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Fake {
    base: String,
    /// (authorization, prefer, body) of every create request.
    creates: Mutex<Vec<(String, String, Value)>>,
    polls: AtomicUsize,
    /// Number of polls answered with `processing` before succeeding.
    pending_polls: usize,
    create_response: Value,
    create_status: Option<StatusCode>,
}

type Shared = Arc<Fake>;

async fn create(
    State(fake): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    fake.creates
        .lock()
        .unwrap()
        .push((header("authorization"), header("prefer"), body));

    let mut response = fake.create_response.clone();
    if response.get("urls").is_none() {
        response["urls"] = json!({ "get": format!("{}/predictions/p1", fake.base) });
    }
    (fake.create_status.unwrap_or(StatusCode::CREATED), Json(response))
}

async fn poll(State(fake): State<Shared>) -> Json<Value> {
    let seen = fake.polls.fetch_add(1, Ordering::SeqCst);
    let get_url = format!("{}/predictions/p1", fake.base);
    if seen < fake.pending_polls {
        Json(json!({"id": "p1", "status": "processing", "urls": {"get": get_url}}))
    } else {
        Json(json!({
            "id": "p1",
            "status": "succeeded",
            "output": "https://cdn.example/polled.jpg",
            "urls": {"get": get_url},
        }))
    }
}

/// Start a fake Replicate API and return its state. `configure` fills in the
/// scripted responses once the base URL is known.
async fn start_fake(configure: impl FnOnce(&mut Fake)) -> Shared {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut fake = Fake {
        base: format!("http://{addr}/v1"),
        ..Fake::default()
    };
    configure(&mut fake);
    let fake = Arc::new(fake);

    let app = Router::new()
        .route(
            "/v1/models/google/gemini-2.5-flash-image/predictions",
            post(create),
        )
        .route("/v1/predictions", post(create))
        .route("/v1/predictions/p1", get(poll))
        .with_state(Arc::clone(&fake));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    fake
}

fn model_for(fake: &Fake, model: &str) -> ReplicateModel {
    ReplicateModel::from_config(ReplicateConfig {
        api_token: Some("test-token".into()),
        api_base: fake.base.clone(),
        model: model.into(),
        poll_interval: Duration::from_millis(10),
        poll_timeout: Duration::from_millis(500),
    })
    .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn synchronous_prediction_returns_output_url() {
    let fake = start_fake(|f| {
        f.create_response = json!({
            "id": "p1",
            "status": "succeeded",
            "output": "https://cdn.example/out1.jpg",
        });
    })
    .await;
    let model = model_for(&fake, "google/gemini-2.5-flash-image");

    let request = GenerationRequest::new(Some("a red bicycle on a beach")).unwrap();
    let url = generate(&model, &request).await.unwrap();
    assert_eq!(url.as_str(), "https://cdn.example/out1.jpg");

    let creates = fake.creates.lock().unwrap();
    assert_eq!(creates.len(), 1);
    let (auth, prefer, body) = &creates[0];
    assert_eq!(auth, "Bearer test-token");
    assert_eq!(prefer, "wait");
    assert_eq!(
        body,
        &json!({"input": {"prompt": "a red bicycle on a beach", "output_format": "jpg"}})
    );
    assert_eq!(fake.polls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn running_prediction_is_polled_until_success() {
    let fake = start_fake(|f| {
        f.create_response = json!({"id": "p1", "status": "starting"});
        f.pending_polls = 2;
    })
    .await;
    let model = model_for(&fake, "google/gemini-2.5-flash-image");

    let request = GenerationRequest::new(Some("a lighthouse")).unwrap();
    let url = generate(&model, &request).await.unwrap();
    assert_eq!(url.as_str(), "https://cdn.example/polled.jpg");
    assert_eq!(fake.polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn pinned_version_uses_predictions_endpoint() {
    let fake = start_fake(|f| {
        f.create_response = json!({
            "id": "p1",
            "status": "succeeded",
            "output": ["https://cdn.example/v.jpg"],
        });
    })
    .await;
    let model = model_for(&fake, "stability-ai/sdxl:abc123");

    let request = GenerationRequest::new(Some("x")).unwrap();
    generate(&model, &request).await.unwrap();

    let creates = fake.creates.lock().unwrap();
    assert_eq!(creates[0].2["version"], "abc123");
    assert_eq!(creates[0].2["input"]["prompt"], "x");
}

#[tokio::test]
async fn failed_prediction_is_upstream_error() {
    let fake = start_fake(|f| {
        f.create_response = json!({"id": "p1", "status": "failed", "error": "E005: flagged"});
    })
    .await;
    let model = model_for(&fake, "google/gemini-2.5-flash-image");

    let request = GenerationRequest::new(Some("x")).unwrap();
    assert_matches!(
        model.run(&request).await.err(),
        Some(CoreError::Upstream(msg)) if msg.contains("E005")
    );
}

#[tokio::test]
async fn error_status_is_reported_with_body() {
    let fake = start_fake(|f| {
        f.create_status = Some(StatusCode::UNAUTHORIZED);
        f.create_response = json!({"detail": "Invalid token"});
    })
    .await;
    let api = ReplicateApi::new(fake.base.clone(), "bad".into());
    let model = ModelRef::parse("google/gemini-2.5-flash-image").unwrap();

    let err = api
        .create_prediction(&model, &json!({"prompt": "x"}))
        .await
        .unwrap_err();
    assert_matches!(err, ReplicateApiError::ApiError { status: 401, ref body } if body.contains("Invalid token"));
}

#[tokio::test]
async fn malformed_body_is_request_error() {
    let fake = start_fake(|f| {
        f.create_response = json!({"unexpected": true});
    })
    .await;
    let api = ReplicateApi::new(fake.base.clone(), "t".into());
    let model = ModelRef::parse("google/gemini-2.5-flash-image").unwrap();

    let err = api
        .create_prediction(&model, &json!({"prompt": "x"}))
        .await
        .unwrap_err();
    assert_matches!(err, ReplicateApiError::Request(_));
}

#[tokio::test]
async fn polling_gives_up_after_timeout() {
    let fake = start_fake(|f| {
        f.create_response = json!({"id": "p1", "status": "processing"});
        f.pending_polls = usize::MAX;
    })
    .await;
    let api = ReplicateApi::new(fake.base.clone(), "t".into());
    let model = ModelRef::parse("google/gemini-2.5-flash-image").unwrap();

    let err = api
        .run(
            &model,
            &json!({"prompt": "x"}),
            Duration::from_millis(10),
            Duration::from_millis(60),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ReplicateApiError::Timeout { ref id, .. } if id == "p1");
}

#[tokio::test]
async fn unreachable_service_is_request_error() {
    // Nothing listens on port 9 of localhost in the test environment.
    let api = ReplicateApi::new("http://127.0.0.1:9/v1".into(), "t".into());
    let model = ModelRef::parse("google/gemini-2.5-flash-image").unwrap();

    let err = api
        .create_prediction(&model, &json!({"prompt": "x"}))
        .await
        .unwrap_err();
    assert_matches!(err, ReplicateApiError::Request(_));
}
