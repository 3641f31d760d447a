use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{CollectionError, Result};

pub const CACHE_FILE_NAME: &str = "records_cache.json";
const DEFAULT_API_URL: &str = "https://api.discogs.com";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Config {
    // Discogs
    pub token: String,
    pub api_url: Url,
    pub user_agent: String,
    pub request_timeout: Duration,

    // Paths
    pub cache_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_url = std::env::var("DISCOGS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let timeout_secs = match std::env::var("REQUEST_TIMEOUT_SECS") {
            Ok(val) if !val.trim().is_empty() => val.trim().parse::<u64>().map_err(|e| {
                CollectionError::Config(format!("REQUEST_TIMEOUT_SECS must be an integer: {}", e))
            })?,
            _ => DEFAULT_TIMEOUT_SECS,
        };

        let config = Self {
            token: std::env::var("DISCOGS_TOKEN").unwrap_or_default(),
            api_url: Url::parse(&api_url)
                .map_err(|e| CollectionError::Config(format!("DISCOGS_API_URL {}: {}", api_url, e)))?,
            user_agent: std::env::var("DISCOGS_USER_AGENT").unwrap_or_else(|_| {
                format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
            }),
            request_timeout: Duration::from_secs(timeout_secs),
            cache_dir: match std::env::var("CACHE_DIR") {
                Ok(val) if !val.trim().is_empty() => val.into(),
                _ => default_cache_dir()?,
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Rejects settings that would make every remote call fail.
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(CollectionError::Auth(
                "DISCOGS_TOKEN is not set (environment or .env file)".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(CollectionError::Config(
                "REQUEST_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.api_url.cannot_be_a_base() {
            return Err(CollectionError::Config(format!(
                "DISCOGS_API_URL is not a base URL: {}",
                self.api_url
            )));
        }

        Ok(())
    }

    pub fn cache_file(&self) -> PathBuf {
        self.cache_dir.join(CACHE_FILE_NAME)
    }

    /// Loggable summary; the token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            API: {} (timeout {}s, agent {})\n  \
            Cache: {}",
            self.api_url,
            self.request_timeout.as_secs(),
            self.user_agent,
            self.cache_file().display()
        )
    }
}

fn default_cache_dir() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|dir| dir.join(env!("CARGO_PKG_NAME")))
        .ok_or_else(|| CollectionError::Config("could not determine the user cache directory".to_string()))
}
