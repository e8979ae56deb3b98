//! [`ImageModel`] backed by a Replicate-hosted model.

use std::fmt;

use async_trait::async_trait;
use imagecraft_core::error::CoreError;
use imagecraft_core::generation::{GenerationRequest, ImageModel, ResultLocation};

use crate::api::{ReplicateApi, ReplicateApiError};
use crate::config::ReplicateConfig;

/// A parsed model reference: `owner/name` or `owner/name:version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
    pub owner: String,
    pub name: String,
    pub version: Option<String>,
}

impl ModelRef {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let raw = raw.trim();
        let (path, version) = match raw.split_once(':') {
            Some((path, version)) => (path, Some(version)),
            None => (raw, None),
        };
        let invalid = || {
            CoreError::Validation(format!(
                "Invalid model reference '{raw}'. Expected owner/name or owner/name:version"
            ))
        };

        let (owner, name) = path.split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }
        if version.is_some_and(str::is_empty) {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            version: version.map(str::to_string),
        })
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        Ok(())
    }
}

impl From<ReplicateApiError> for CoreError {
    fn from(err: ReplicateApiError) -> Self {
        CoreError::Upstream(err.to_string())
    }
}

/// Runs generation requests on a Replicate model.
pub struct ReplicateModel {
    /// `None` when no API token is configured.
    api: Option<ReplicateApi>,
    model: ModelRef,
    label: String,
    config: ReplicateConfig,
}

impl ReplicateModel {
    pub fn from_config(config: ReplicateConfig) -> Result<Self, CoreError> {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: ReplicateConfig) -> Result<Self, CoreError> {
        let model = ModelRef::parse(&config.model)?;
        let api = config
            .api_token
            .clone()
            .map(|token| ReplicateApi::with_client(client, config.api_base.clone(), token));
        if api.is_none() {
            tracing::warn!("REPLICATE_API_TOKEN not set; generation requests will fail");
        }
        Ok(Self {
            api,
            label: model.to_string(),
            model,
            config,
        })
    }
}

#[async_trait]
impl ImageModel for ReplicateModel {
    fn name(&self) -> &str {
        &self.label
    }

    async fn run(&self, request: &GenerationRequest) -> Result<Box<dyn ResultLocation>, CoreError> {
        let api = self
            .api
            .as_ref()
            .ok_or_else(|| CoreError::Upstream("REPLICATE_API_TOKEN not set".to_string()))?;

        let prediction = api
            .run(
                &self.model,
                request,
                self.config.poll_interval,
                self.config.poll_timeout,
            )
            .await?;
        tracing::info!(id = %prediction.id, model = %self.label, "Prediction succeeded");

        Ok(Box::new(prediction))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_official_model() {
        let model = ModelRef::parse("google/gemini-2.5-flash-image").unwrap();
        assert_eq!(model.owner, "google");
        assert_eq!(model.name, "gemini-2.5-flash-image");
        assert_eq!(model.version, None);
        assert_eq!(model.to_string(), "google/gemini-2.5-flash-image");
    }

    #[test]
    fn parses_pinned_version() {
        let model = ModelRef::parse("stability-ai/sdxl:39ed52f2").unwrap();
        assert_eq!(model.version.as_deref(), Some("39ed52f2"));
        assert_eq!(model.to_string(), "stability-ai/sdxl:39ed52f2");
    }

    #[test]
    fn rejects_bad_references() {
        for raw in ["", "sdxl", "/name", "owner/", "a/b/c", "owner/name:"] {
            assert_matches!(ModelRef::parse(raw), Err(CoreError::Validation(_)), "{raw}");
        }
    }

    #[tokio::test]
    async fn missing_token_fails_without_network() {
        let model = ReplicateModel::from_config(ReplicateConfig::default()).unwrap();
        let request = GenerationRequest::new(Some("a cat")).unwrap();
        assert_matches!(model.run(&request).await.err(), Some(CoreError::Upstream(_)));
    }
}
