//! Route definitions for image generation and editing.

use axum::routing::post;
use axum::Router;

use crate::handlers::generate;
use crate::state::AppState;

/// Generation routes mounted under `/api/v1`.
///
/// ```text
/// POST /generate -> generate_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/generate", post(generate::generate_image))
}
