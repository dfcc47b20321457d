use serde::Deserialize;
use std::time::Duration;

use crate::services::recommender::RecommenderSettings;

/// Which key-value backend persists history and interactions
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
    Redis,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackend,

    /// Directory used by the file backend
    #[serde(default = "default_storage_path")]
    pub storage_path: String,

    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Origin of the blog serving the like endpoint
    #[serde(default = "default_blog_base_url")]
    pub blog_base_url: String,

    /// Sent as `X-CSRFToken` on like requests
    #[serde(default)]
    pub csrf_token: Option<String>,

    #[serde(default = "default_recommendation_limit")]
    pub recommendation_limit: usize,

    /// Personalized results at or below this similarity are dropped
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Memory
}

fn default_storage_path() -> String {
    ".blog-recommender".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_blog_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_recommendation_limit() -> usize {
    5
}

fn default_similarity_threshold() -> f64 {
    0.1
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_refresh_interval_secs() -> u64 {
    120
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn recommender_settings(&self) -> RecommenderSettings {
        RecommenderSettings {
            limit: self.recommendation_limit,
            similarity_threshold: self.similarity_threshold,
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}
