//! Trades CMS Common Library
//!
//! Shared code for the content gateway and the maintenance tooling:
//! - Database models and repository patterns
//! - Coverage quality gate
//! - Image rendition URLs
//! - Error types and handling
//! - Configuration management
//! - Logging setup, metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod media;
pub mod metrics;
pub mod quality;
pub mod telemetry;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use media::{ImageRef, MediaResolver};
pub use quality::{QualityPolicy, QualityReport, Readiness};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default rendition filter spec for public image URLs
pub const DEFAULT_RENDITION_SPEC: &str = "width-1200|format-webp";
