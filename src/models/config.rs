//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP pacing and retry behavior
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Upstream API locations
    #[serde(default)]
    pub api: ApiConfig,

    /// Neighborhood recommendation settings
    #[serde(default)]
    pub recommender: RecommenderConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        Url::parse(&self.api.xmlapi2_url)
            .map_err(|e| AppError::validation(format!("api.xmlapi2_url: {e}")))?;
        Url::parse(&self.api.xmlapi_url)
            .map_err(|e| AppError::validation(format!("api.xmlapi_url: {e}")))?;
        if self.recommender.sample_size < 2 {
            return Err(AppError::validation(
                "recommender.sample_size must be >= 2",
            ));
        }
        if self.recommender.top_k == 0 {
            return Err(AppError::validation("recommender.top_k must be > 0"));
        }
        if self.recommender.min_overlap == 0 {
            return Err(AppError::validation(
                "recommender.min_overlap must be > 0",
            ));
        }
        Ok(())
    }
}

/// HTTP client, pacing and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay before every request attempt, retries included
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Wait after a 202 "still processing" answer
    #[serde(default = "defaults::processing_backoff")]
    pub processing_backoff_ms: u64,

    /// Wait after server errors and transport failures
    #[serde(default = "defaults::error_backoff")]
    pub error_backoff_ms: u64,

    /// Retries allowed per URL after the first attempt
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn processing_backoff(&self) -> Duration {
        Duration::from_millis(self.processing_backoff_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            processing_backoff_ms: defaults::processing_backoff(),
            error_backoff_ms: defaults::error_backoff(),
            max_retries: defaults::max_retries(),
        }
    }
}

/// Upstream XML API locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base of the v2 API (forum lists, forums, threads, users)
    #[serde(default = "defaults::xmlapi2_url")]
    pub xmlapi2_url: String,

    /// Base of the legacy API (collections)
    #[serde(default = "defaults::xmlapi_url")]
    pub xmlapi_url: String,

    /// Ask for buddy lists on user lookups
    #[serde(default = "defaults::include_buddies")]
    pub include_buddies: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            xmlapi2_url: defaults::xmlapi2_url(),
            xmlapi_url: defaults::xmlapi_url(),
            include_buddies: defaults::include_buddies(),
        }
    }
}

/// Recommendation engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommenderConfig {
    /// Upper bound on ratings records loaded per query
    #[serde(default = "defaults::sample_size")]
    pub sample_size: usize,

    /// Number of ranked candidates resolved and returned
    #[serde(default = "defaults::top_k")]
    pub top_k: usize,

    /// Co-rated games a neighbor needs before it counts
    #[serde(default = "defaults::min_overlap")]
    pub min_overlap: usize,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            sample_size: defaults::sample_size(),
            top_k: defaults::top_k(),
            min_overlap: defaults::min_overlap(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; bgg-harvest/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        5_000
    }
    pub fn processing_backoff() -> u64 {
        5_000
    }
    pub fn error_backoff() -> u64 {
        30_000
    }
    pub fn max_retries() -> u32 {
        100
    }

    // API defaults
    pub fn xmlapi2_url() -> String {
        "https://boardgamegeek.com/xmlapi2".into()
    }
    pub fn xmlapi_url() -> String {
        "https://boardgamegeek.com/xmlapi".into()
    }
    pub fn include_buddies() -> bool {
        true
    }

    // Recommender defaults
    pub fn sample_size() -> usize {
        1_000
    }
    pub fn top_k() -> usize {
        10
    }
    pub fn min_overlap() -> usize {
        1
    }
}
