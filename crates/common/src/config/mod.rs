//! Configuration management for Trades CMS services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Lead capture rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Coverage quality gate thresholds
    #[serde(default)]
    pub quality: QualityConfig,

    /// Image URL settings
    #[serde(default)]
    pub media: MediaConfig,

    /// Page-tree deduplication targets
    #[serde(default)]
    pub dedupe: DedupeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Apply pending schema migrations at gateway startup
    #[serde(default)]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error) or a full EnvFilter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Lead submissions allowed per minute, per client address
    #[serde(default = "default_leads_per_minute")]
    pub leads_per_minute: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QualityConfig {
    /// Minimum words across intro and local modules
    #[serde(default = "default_min_words")]
    pub min_words: usize,

    /// Minimum number of local modules
    #[serde(default = "default_min_modules")]
    pub min_modules: usize,

    /// Minimum images (hero + embedded)
    #[serde(default = "default_min_images")]
    pub min_images: usize,

    /// Whether a testimonial on the same geo area is required
    #[serde(default = "default_enabled")]
    pub require_local_testimonial: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    /// URL prefix for stored files
    #[serde(default = "default_media_url")]
    pub media_url: String,

    /// Rendition filter spec used for public image URLs
    #[serde(default = "default_rendition_spec")]
    pub rendition_spec: String,

    /// Public origin for absolute URLs (falls back to the request host)
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DedupeConfig {
    /// Page types that must exist exactly once
    #[serde(default = "default_dedupe_targets")]
    pub targets: Vec<DedupeTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DedupeTarget {
    /// Content-type key of the canonical page (e.g. `servicesindexpage`)
    pub content_type: String,

    /// Title duplicates are matched against, case-insensitively
    pub title: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_request_timeout() -> u64 { 30 }
fn default_max_concurrent() -> usize { 100 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_leads_per_minute() -> u32 { 5 }
fn default_burst() -> u32 { 5 }
fn default_enabled() -> bool { true }
fn default_min_words() -> usize { 700 }
fn default_min_modules() -> usize { 6 }
fn default_min_images() -> usize { 6 }
fn default_media_url() -> String { "/media/".to_string() }
fn default_rendition_spec() -> String { crate::DEFAULT_RENDITION_SPEC.to_string() }
fn default_dedupe_targets() -> Vec<DedupeTarget> {
    vec![
        DedupeTarget {
            content_type: "servicesindexpage".to_string(),
            title: "Services".to_string(),
        },
        DedupeTarget {
            content_type: "portfolioindexpage".to_string(),
            title: "Portfolio".to_string(),
        },
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            leads_per_minute: default_leads_per_minute(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_words: default_min_words(),
            min_modules: default_min_modules(),
            min_images: default_min_images(),
            require_local_testimonial: default_enabled(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            media_url: default_media_url(),
            rendition_spec: default_rendition_spec(),
            public_base_url: None,
        }
    }
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            targets: default_dedupe_targets(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__DATABASE__URL=postgres://...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/trades".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
                run_migrations: false,
            },
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
            quality: QualityConfig::default(),
            media: MediaConfig::default(),
            dedupe: DedupeConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.quality.min_words, 700);
        assert_eq!(config.quality.min_modules, 6);
        assert_eq!(config.quality.min_images, 6);
        assert_eq!(config.media.rendition_spec, "width-1200|format-webp");
    }

    #[test]
    fn test_default_dedupe_targets() {
        let config = AppConfig::default();
        let keys: Vec<_> = config.dedupe.targets.iter().map(|t| t.content_type.as_str()).collect();
        assert_eq!(keys, vec!["servicesindexpage", "portfolioindexpage"]);
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AppConfig = Config::builder()
            .set_override("database.url", "postgres://db/site")
            .unwrap()
            .set_override("quality.min_words", 400)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.database.url, "postgres://db/site");
        assert_eq!(config.quality.min_words, 400);
        assert_eq!(config.quality.min_images, 6);
        assert!(config.rate_limit.enabled);
    }
}
