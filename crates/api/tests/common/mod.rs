#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use imagecraft_core::error::CoreError;
use imagecraft_core::generation::{GenerationRequest, ImageModel, ResultLocation};
use imagecraft_core::pipeline::Decoder;
use imagecraft_core::preview::decode_preview;
use tower::ServiceExt;
use url::Url;

use imagecraft_api::config::ServerConfig;
use imagecraft_api::router::build_app_router;
use imagecraft_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        generation_timeout: Duration::from_secs(10),
        shutdown_timeout_secs: 5,
        max_body_bytes: 64 * 1024 * 1024,
    }
}

/// Build the full application router, with the production middleware stack
/// and preview decoder, around the given model.
pub fn build_test_app(model: Arc<dyn ImageModel>) -> Router {
    build_test_app_with_config(model, test_config())
}

/// Like [`build_test_app`], with a caller-supplied configuration.
pub fn build_test_app_with_config(model: Arc<dyn ImageModel>, config: ServerConfig) -> Router {
    let decoder: Decoder = Arc::new(decode_preview);
    let state = AppState {
        config: Arc::new(config.clone()),
        model,
        preview_decoder: decoder,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Fake model
// ---------------------------------------------------------------------------

/// What the fake model answers with.
#[derive(Clone)]
pub enum Script {
    /// Succeed with this raw output string.
    Output(&'static str),
    /// Fail the call with an upstream error.
    Upstream(&'static str),
    /// Sleep this long, then succeed.
    Stall(Duration),
}

struct RawOutput(String);

impl ResultLocation for RawOutput {
    fn result_location(&self) -> Result<Url, CoreError> {
        Url::parse(&self.0).map_err(|e| CoreError::MalformedResponse(e.to_string()))
    }
}

/// Model that records every request and answers from a script.
pub struct RecordingModel {
    script: Script,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl RecordingModel {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageModel for RecordingModel {
    fn name(&self) -> &str {
        "test/recording-model"
    }

    async fn run(&self, request: &GenerationRequest) -> Result<Box<dyn ResultLocation>, CoreError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.script {
            Script::Output(raw) => Ok(Box::new(RawOutput(raw.to_string()))),
            Script::Upstream(msg) => Err(CoreError::Upstream(msg.to_string())),
            Script::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Box::new(RawOutput("https://cdn.example/late.jpg".to_string())))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, path: &str) -> Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, path: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, path, "application/json", body.to_string().into_bytes()).await
}

pub async fn post_raw(
    app: Router,
    path: &str,
    content_type: &str,
    body: Vec<u8>,
) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
