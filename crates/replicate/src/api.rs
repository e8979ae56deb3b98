//! REST API client for the Replicate predictions endpoints.
//!
//! Wraps prediction creation and polling using [`reqwest`]. Creation asks
//! Replicate to hold the connection until the prediction finishes
//! (`Prefer: wait`); predictions that are still running when that returns are
//! polled through their `urls.get` link.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::model::ModelRef;
use crate::prediction::{Prediction, PredictionStatus};

/// HTTP client for the Replicate API.
#[derive(Clone)]
pub struct ReplicateApi {
    client: reqwest::Client,
    api_base: String,
    api_token: String,
}

/// Errors from the Replicate REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ReplicateApiError {
    /// The HTTP request itself failed (network, DNS, TLS, body decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Replicate returned a non-2xx status code.
    #[error("Replicate API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The prediction finished without succeeding.
    #[error("Prediction {id} {status}: {message}")]
    PredictionFailed {
        id: String,
        status: PredictionStatus,
        message: String,
    },

    /// The prediction was still running when the poll timeout expired.
    #[error("Prediction {id} did not finish within {seconds}s")]
    Timeout { id: String, seconds: u64 },

    /// A running prediction came back without a link to poll.
    #[error("Prediction {0} has no poll URL")]
    MissingPollUrl(String),
}

/// Body of a create-prediction request.
#[derive(Serialize)]
struct CreatePrediction<'a, I: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    input: &'a I,
}

impl ReplicateApi {
    /// Create a new API client.
    ///
    /// * `api_base` - Base URL without trailing slash, e.g. `https://api.replicate.com/v1`.
    pub fn new(api_base: String, api_token: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_base, api_token)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_base: String, api_token: String) -> Self {
        Self {
            client,
            api_base,
            api_token,
        }
    }

    /// Create a prediction for `model` and wait (server side) for it to finish.
    ///
    /// Official models (`owner/name`) are created through
    /// `POST /models/{owner}/{name}/predictions`; pinned versions
    /// (`owner/name:version`) through `POST /predictions`.
    pub async fn create_prediction<I: Serialize>(
        &self,
        model: &ModelRef,
        input: &I,
    ) -> Result<Prediction, ReplicateApiError> {
        let (endpoint, version) = match model.version.as_deref() {
            Some(version) => (format!("{}/predictions", self.api_base), Some(version)),
            None => (
                format!(
                    "{}/models/{}/{}/predictions",
                    self.api_base, model.owner, model.name
                ),
                None,
            ),
        };

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_token)
            .header("Prefer", "wait")
            .json(&CreatePrediction { version, input })
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the latest state of a prediction from its poll URL.
    pub async fn get_prediction(&self, poll_url: &str) -> Result<Prediction, ReplicateApiError> {
        let response = self
            .client
            .get(poll_url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Poll `prediction` until it reaches a terminal status.
    ///
    /// Returns the succeeded prediction, or an error if it failed, was
    /// canceled, or is still running after `timeout`.
    pub async fn wait_for_prediction(
        &self,
        mut prediction: Prediction,
        interval: Duration,
        timeout: Duration,
    ) -> Result<Prediction, ReplicateApiError> {
        let started = Instant::now();
        while !prediction.status.is_terminal() {
            if started.elapsed() >= timeout {
                return Err(ReplicateApiError::Timeout {
                    id: prediction.id,
                    seconds: timeout.as_secs(),
                });
            }
            let poll_url = prediction
                .urls
                .get
                .clone()
                .filter(|url| !url.trim().is_empty())
                .ok_or_else(|| ReplicateApiError::MissingPollUrl(prediction.id.clone()))?;

            tokio::time::sleep(interval).await;
            tracing::debug!(id = %prediction.id, status = %prediction.status, "Polling prediction");
            prediction = self.get_prediction(&poll_url).await?;
        }

        if prediction.status != PredictionStatus::Succeeded {
            return Err(ReplicateApiError::PredictionFailed {
                message: prediction.error_message(),
                id: prediction.id,
                status: prediction.status,
            });
        }
        Ok(prediction)
    }

    /// Create a prediction and wait for it to succeed.
    pub async fn run<I: Serialize>(
        &self,
        model: &ModelRef,
        input: &I,
        poll_interval: Duration,
        poll_timeout: Duration,
    ) -> Result<Prediction, ReplicateApiError> {
        let prediction = self.create_prediction(model, input).await?;
        tracing::debug!(id = %prediction.id, status = %prediction.status, "Prediction created");
        self.wait_for_prediction(prediction, poll_interval, poll_timeout)
            .await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ReplicateApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ReplicateApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ReplicateApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ReplicateApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
