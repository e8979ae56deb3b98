use axum::routing::post;
use axum::Router;

use crate::handlers::previews;
use crate::state::AppState;

/// Preview routes mounted under `/api/v1`.
///
/// ```text
/// POST /previews -> create_previews
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/previews", post(previews::create_previews))
}
