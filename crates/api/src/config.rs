use std::time::Duration;

/// Margin kept between the generation timeout and the HTTP timeout.
pub const GENERATION_TIMEOUT_HEADROOM: Duration = Duration::from_secs(5);

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `200`). Never applied below
    /// `generation_timeout` plus [`GENERATION_TIMEOUT_HEADROOM`]; see
    /// [`ServerConfig::request_timeout`].
    pub request_timeout_secs: u64,
    /// Upper bound on one model call made by the generate endpoint
    /// (default: `190` seconds, above Replicate's synchronous wait plus the
    /// default poll timeout).
    pub generation_timeout: Duration,
    /// How long in-flight requests may drain after a shutdown signal
    /// (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Largest accepted request body in bytes (default: 64 MiB). Covers a
    /// full batch of images, whether uploaded raw or as data URIs.
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `3000`                  |
    /// | `CORS_ORIGINS`            | `http://localhost:3000` |
    /// | `REQUEST_TIMEOUT_SECS`    | `200`                   |
    /// | `GENERATION_TIMEOUT_SECS` | `190`                   |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `30`                    |
    /// | `MAX_BODY_BYTES`          | `67108864`              |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "200".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let generation_timeout_secs: u64 = std::env::var("GENERATION_TIMEOUT_SECS")
            .unwrap_or_else(|_| "190".into())
            .parse()
            .expect("GENERATION_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let max_body_bytes: usize = std::env::var("MAX_BODY_BYTES")
            .unwrap_or_else(|_| (64 * 1024 * 1024).to_string())
            .parse()
            .expect("MAX_BODY_BYTES must be a valid usize");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            generation_timeout: Duration::from_secs(generation_timeout_secs),
            shutdown_timeout_secs,
            max_body_bytes,
        }
    }

    /// Timeout applied by the HTTP timeout layer.
    ///
    /// At least `generation_timeout` plus [`GENERATION_TIMEOUT_HEADROOM`]: a
    /// model call that runs out of time ends in the generate endpoint's fixed
    /// 500 reply, never in the layer's empty 408.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
            .max(self.generation_timeout + GENERATION_TIMEOUT_HEADROOM)
    }
}
