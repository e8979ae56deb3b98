pub mod generate;
pub mod health;
pub mod previews;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generate                POST  prompt -> hosted model -> result URL
/// /previews                POST  multipart images -> per-file previews
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(generate::router())
        .merge(previews::router())
}
