//! Generation request contracts shared by the HTTP handler and the editor
//! session.
//!
//! The external model is reached only through [`ImageModel`], and its output
//! only through the narrow [`ResultLocation`] capability, so neither caller
//! depends on a concrete provider response type.

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Output format requested from the model for every generation.
pub const OUTPUT_FORMAT: &str = "jpg";

pub const MSG_PROMPT_REQUIRED: &str = "Prompt is required";
pub const MSG_GENERATION_FAILED: &str = "Failed to generate image";
pub const MSG_GENERATION_SUCCEEDED: &str = "Image generated successfully";

// ---------------------------------------------------------------------------
// Request / result
// ---------------------------------------------------------------------------

/// Input sent to the model. Serializes to the model's `input` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Images to edit (data URIs or URLs). Omitted from the payload when empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_input: Vec<String>,
    pub output_format: &'static str,
}

impl GenerationRequest {
    /// Build a request from an optional prompt.
    ///
    /// Missing and empty prompts are rejected. Any other prompt, including
    /// one made only of whitespace, is forwarded exactly as given; trimming
    /// belongs to the editor's submit gate.
    pub fn new(prompt: Option<&str>) -> Result<Self, CoreError> {
        let prompt = validate_prompt(prompt)?;
        Ok(Self {
            prompt: prompt.to_string(),
            image_input: Vec::new(),
            output_format: OUTPUT_FORMAT,
        })
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.image_input = images;
        self
    }
}

/// Check that a prompt is present and non-empty.
pub fn validate_prompt(prompt: Option<&str>) -> Result<&str, CoreError> {
    match prompt {
        Some(p) if !p.is_empty() => Ok(p),
        _ => Err(CoreError::Validation(MSG_PROMPT_REQUIRED.to_string())),
    }
}

/// Outcome of one request/response cycle. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationResult {
    Success { output: Url },
    Failure { message: String },
}

impl GenerationResult {
    pub fn output(&self) -> Option<&Url> {
        match self {
            GenerationResult::Success { output } => Some(output),
            GenerationResult::Failure { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Model seam
// ---------------------------------------------------------------------------

/// Anything that can yield the final location of a generated image.
pub trait ResultLocation: Send + Sync {
    fn result_location(&self) -> Result<Url, CoreError>;
}

/// A hosted image model.
#[async_trait]
pub trait ImageModel: Send + Sync {
    /// Model identifier, for logging.
    fn name(&self) -> &str;

    /// Run the model once and wait for it to finish.
    async fn run(&self, request: &GenerationRequest) -> Result<Box<dyn ResultLocation>, CoreError>;
}

/// Run `request` on `model` and resolve the single result URL.
///
/// Exactly one call is made to the model; there are no retries.
pub async fn generate(model: &dyn ImageModel, request: &GenerationRequest) -> Result<Url, CoreError> {
    let output = model.run(request).await?;
    output.result_location()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
