//! Replicate REST client for hosted image models.
//!
//! Provides the predictions API wrapper, typed prediction payloads, and an
//! [`imagecraft_core::generation::ImageModel`] implementation backed by a
//! Replicate-hosted model.

pub mod api;
pub mod config;
pub mod model;
pub mod prediction;
