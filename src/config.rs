use anyhow::Context;
use axum::http::HeaderValue;
use serde::Deserialize;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL connection URL; the in-memory store is used when unset
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// Redis connection URL for caching catalog responses
    #[serde(default)]
    pub redis_url: Option<String>,

    /// TMDB API key
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    #[serde(default = "default_tmdb_language")]
    pub tmdb_language: String,

    /// Upper bound on every catalog request, in seconds
    #[serde(default = "default_tmdb_timeout_secs")]
    pub tmdb_timeout_secs: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed browser origin; any origin when unset
    #[serde(default)]
    pub cors_origin: Option<String>,
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_language() -> String {
    "en-US".to_string()
}

fn default_tmdb_timeout_secs() -> u64 {
    10
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.cors_allowed_origin()?;
        Ok(config)
    }

    /// The single browser origin allowed by CORS, `None` for any origin
    ///
    /// A value that is not a valid header is an error; it never widens to
    /// "any origin".
    pub fn cors_allowed_origin(&self) -> anyhow::Result<Option<HeaderValue>> {
        let Some(origin) = self.cors_origin.as_deref() else {
            return Ok(None);
        };
        let trimmed = origin.trim();
        if trimmed.is_empty() || trimmed == "*" || trimmed != origin {
            anyhow::bail!("Invalid CORS_ORIGIN {:?}: expected a single origin", origin);
        }
        let value = HeaderValue::from_str(trimmed)
            .with_context(|| format!("Invalid CORS_ORIGIN {:?}", origin))?;
        Ok(Some(value))
    }

    pub fn tmdb_timeout(&self) -> Duration {
        Duration::from_secs(self.tmdb_timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
