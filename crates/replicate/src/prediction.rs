//! Typed Replicate prediction payloads.

use imagecraft_core::error::CoreError;
use imagecraft_core::generation::ResultLocation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Lifecycle status of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl PredictionStatus {
    /// Whether the prediction will not change any more.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PredictionStatus::Succeeded | PredictionStatus::Failed | PredictionStatus::Canceled
        )
    }
}

impl std::fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PredictionStatus::Starting => "starting",
            PredictionStatus::Processing => "processing",
            PredictionStatus::Succeeded => "succeeded",
            PredictionStatus::Failed => "failed",
            PredictionStatus::Canceled => "canceled",
            PredictionStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionUrls {
    /// URL to poll for the latest state.
    pub get: Option<String>,
    pub cancel: Option<String>,
}

/// A prediction as returned by `POST /predictions` and `GET /predictions/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: PredictionStatus,
    /// Model output; shape depends on the model.
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub urls: PredictionUrls,
}

impl Prediction {
    /// Human-readable error reported by Replicate, if any.
    pub fn error_message(&self) -> String {
        match &self.error {
            Some(Value::String(msg)) => msg.clone(),
            Some(Value::Null) | None => "no error message".to_string(),
            Some(other) => other.to_string(),
        }
    }
}

impl ResultLocation for Prediction {
    /// The single output URL of a succeeded prediction.
    ///
    /// Accepts an output that is either a URL string or an array holding
    /// exactly one URL string. Anything else is a malformed response.
    fn result_location(&self) -> Result<Url, CoreError> {
        if self.status != PredictionStatus::Succeeded {
            return Err(CoreError::MalformedResponse(format!(
                "prediction {} is {}, not succeeded",
                self.id, self.status
            )));
        }

        let raw = match &self.output {
            Value::String(url) => url.as_str(),
            Value::Array(items) if items.len() == 1 => items[0].as_str().ok_or_else(|| {
                CoreError::MalformedResponse(format!(
                    "prediction {} output item is not a string",
                    self.id
                ))
            })?,
            other => {
                return Err(CoreError::MalformedResponse(format!(
                    "prediction {} output is not a single URL: {other}",
                    self.id
                )))
            }
        };

        let url = Url::parse(raw.trim()).map_err(|e| {
            CoreError::MalformedResponse(format!("prediction {} output URL: {e}", self.id))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::MalformedResponse(format!(
                "prediction {} output is not an http(s) URL",
                self.id
            )));
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn prediction(value: Value) -> Prediction {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn string_output_resolves() {
        let p = prediction(json!({
            "id": "p1",
            "status": "succeeded",
            "output": "https://replicate.delivery/xezq/out-0.jpg",
        }));
        assert_eq!(
            p.result_location().unwrap().as_str(),
            "https://replicate.delivery/xezq/out-0.jpg"
        );
    }

    #[test]
    fn single_item_array_resolves() {
        let p = prediction(json!({
            "id": "p1",
            "status": "succeeded",
            "output": ["https://cdn.example/out1.jpg"],
        }));
        assert_eq!(
            p.result_location().unwrap().as_str(),
            "https://cdn.example/out1.jpg"
        );
    }

    #[test]
    fn multiple_outputs_are_malformed() {
        let p = prediction(json!({
            "id": "p1",
            "status": "succeeded",
            "output": ["https://a.example/1.jpg", "https://a.example/2.jpg"],
        }));
        assert_matches!(p.result_location(), Err(CoreError::MalformedResponse(_)));
    }

    #[test]
    fn missing_or_non_http_output_is_malformed() {
        let missing = prediction(json!({"id": "p1", "status": "succeeded"}));
        assert_matches!(missing.result_location(), Err(CoreError::MalformedResponse(_)));

        let not_url = prediction(json!({"id": "p1", "status": "succeeded", "output": "hello"}));
        assert_matches!(not_url.result_location(), Err(CoreError::MalformedResponse(_)));

        let data = prediction(json!({
            "id": "p1",
            "status": "succeeded",
            "output": "data:image/png;base64,AAAA",
        }));
        assert_matches!(data.result_location(), Err(CoreError::MalformedResponse(_)));
    }

    #[test]
    fn unfinished_prediction_has_no_location() {
        let p = prediction(json!({"id": "p1", "status": "processing", "output": null}));
        assert_matches!(p.result_location(), Err(CoreError::MalformedResponse(_)));
    }

    #[test]
    fn unknown_status_deserializes() {
        let p = prediction(json!({"id": "p1", "status": "queued"}));
        assert_eq!(p.status, PredictionStatus::Unknown);
        assert!(!p.status.is_terminal());
    }

    #[test]
    fn error_message_variants() {
        let p = prediction(json!({"id": "p1", "status": "failed", "error": "NSFW"}));
        assert_eq!(p.error_message(), "NSFW");
        let p = prediction(json!({"id": "p1", "status": "failed", "error": null}));
        assert_eq!(p.error_message(), "no error message");
    }
}
