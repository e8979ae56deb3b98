use std::sync::Arc;

use imagecraft_core::generation::ImageModel;
use imagecraft_core::pipeline::Decoder;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Hosted model used for generation and editing.
    pub model: Arc<dyn ImageModel>,
    /// Turns uploaded files into previews.
    pub preview_decoder: Decoder,
}
