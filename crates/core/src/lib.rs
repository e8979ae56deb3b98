//! Domain logic for the imagecraft editor service.
//!
//! Holds everything that does not need an HTTP server: upload acceptance
//! rules, the asynchronous preview pipeline, the generation contracts the
//! server and session share, and the editor state model.

pub mod editor;
pub mod error;
pub mod generation;
pub mod pipeline;
pub mod preview;
pub mod session;
pub mod upload;
