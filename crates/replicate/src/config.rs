use std::time::Duration;

/// Default Replicate API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.replicate.com/v1";
/// Model used for both editing and generation.
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash-image";

/// Replicate client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    /// API token. Without one every generation fails upstream.
    pub api_token: Option<String>,
    /// API base URL without a trailing slash.
    pub api_base: String,
    /// Model reference, `owner/name` or `owner/name:version`.
    pub model: String,
    /// Delay between polls of an unfinished prediction.
    pub poll_interval: Duration,
    /// Give up on a prediction that has not finished after this long.
    pub poll_timeout: Duration,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            poll_interval: Duration::from_millis(1000),
            poll_timeout: Duration::from_secs(120),
        }
    }
}

impl ReplicateConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                           |
    /// |-------------------------------|-----------------------------------|
    /// | `REPLICATE_API_TOKEN`         | none                              |
    /// | `REPLICATE_API_BASE`          | `https://api.replicate.com/v1`    |
    /// | `REPLICATE_MODEL`             | `google/gemini-2.5-flash-image`   |
    /// | `REPLICATE_POLL_INTERVAL_MS`  | `1000`                            |
    /// | `REPLICATE_POLL_TIMEOUT_SECS` | `120`                             |
    pub fn from_env() -> Self {
        let api_token = non_empty_env("REPLICATE_API_TOKEN");

        let api_base = non_empty_env("REPLICATE_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.into());

        let model = non_empty_env("REPLICATE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into());

        let poll_interval_ms: u64 = std::env::var("REPLICATE_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("REPLICATE_POLL_INTERVAL_MS must be a valid u64");

        let poll_timeout_secs: u64 = std::env::var("REPLICATE_POLL_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("REPLICATE_POLL_TIMEOUT_SECS must be a valid u64");

        Self {
            api_token,
            api_base,
            model,
            poll_interval: Duration::from_millis(poll_interval_ms),
            poll_timeout: Duration::from_secs(poll_timeout_secs),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
