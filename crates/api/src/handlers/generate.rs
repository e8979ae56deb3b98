//! Handler for prompt-based image generation and editing.
//!
//! The endpoint keeps a fixed response contract that browser clients rely
//! on, so it answers with its own reply shapes instead of the
//! [`AppError`](crate::error::AppError) envelope:
//!
//! - 200 `{ "success": true, "output": <url>, "message": "Image generated successfully" }`
//! - 400 `{ "error": "Prompt is required" }`
//! - 500 `{ "error": "Failed to generate image" }`
//!
//! Upstream failure details are logged and never returned to the caller.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use imagecraft_core::generation::{
    generate, GenerationRequest, MSG_GENERATION_FAILED, MSG_GENERATION_SUCCEEDED,
    MSG_PROMPT_REQUIRED,
};
use imagecraft_core::upload::MAX_FILES_PER_BATCH;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SuccessBody<'a> {
    success: bool,
    output: &'a str,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Outcome of one generate call, rendered with its fixed status and shape.
#[derive(Debug, PartialEq, Eq)]
pub enum GenerateReply {
    /// The model produced an image at `output`.
    Generated(Url),
    /// The request was rejected before any model call.
    Rejected(String),
    /// The request or the model call failed.
    Failed,
}

impl IntoResponse for GenerateReply {
    fn into_response(self) -> Response {
        match self {
            GenerateReply::Generated(output) => (
                StatusCode::OK,
                Json(SuccessBody {
                    success: true,
                    output: output.as_str(),
                    message: MSG_GENERATION_SUCCEEDED,
                }),
            )
                .into_response(),
            GenerateReply::Rejected(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody { error: &message })).into_response()
            }
            GenerateReply::Failed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: MSG_GENERATION_FAILED,
                }),
            )
                .into_response(),
        }
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// POST /api/v1/generate
///
/// Body: `{ "prompt": string, "images"?: [string] }`. `images` holds data URIs
/// or URLs of the pictures to edit and is forwarded as the model's
/// `image_input`. Exactly one model call is made per valid request, bounded
/// by [`ServerConfig::generation_timeout`](crate::config::ServerConfig).
pub async fn generate_image(State(state): State<AppState>, body: Bytes) -> GenerateReply {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "Generate request body is not valid JSON");
            return GenerateReply::Failed;
        }
    };

    let prompt = payload.get("prompt").and_then(Value::as_str);
    let request = match GenerationRequest::new(prompt) {
        Ok(request) => request,
        Err(_) => return GenerateReply::Rejected(MSG_PROMPT_REQUIRED.to_string()),
    };

    let images = match parse_images(payload.get("images")) {
        Ok(images) => images,
        Err(message) => return GenerateReply::Rejected(message),
    };
    let request = request.with_images(images);

    tracing::info!(
        model = %state.model.name(),
        prompt_chars = request.prompt.chars().count(),
        images = request.image_input.len(),
        "Generating image",
    );

    let deadline = state.config.generation_timeout;
    match tokio::time::timeout(deadline, generate(state.model.as_ref(), &request)).await {
        Ok(Ok(output)) => {
            tracing::info!(output = %output, "Image generated");
            GenerateReply::Generated(output)
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, model = %state.model.name(), "Error generating image");
            GenerateReply::Failed
        }
        Err(_) => {
            tracing::error!(
                timeout_ms = deadline.as_millis() as u64,
                model = %state.model.name(),
                "Image generation timed out",
            );
            GenerateReply::Failed
        }
    }
}

/// Read the optional `images` field: absent or `null` means none; otherwise
/// an array of at most [`MAX_FILES_PER_BATCH`] non-empty strings.
fn parse_images(raw: Option<&Value>) -> Result<Vec<String>, String> {
    let items = match raw {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err("Images must be an array of strings".to_string()),
    };

    if items.len() > MAX_FILES_PER_BATCH {
        return Err(format!(
            "At most {MAX_FILES_PER_BATCH} images can be edited at once"
        ));
    }

    items
        .iter()
        .map(|item| match item.as_str() {
            Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
            _ => Err("Images must be an array of strings".to_string()),
        })
        .collect()
}
