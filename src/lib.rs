//! Indumine Crawler: a remotely controllable catalog crawler
//!
//! This crate implements the crawl orchestration engine for a large public
//! product catalog: a bounded pool of headless browser sessions, a
//! cooperative scheduler driving discovery and extraction passes, a
//! resumable CSV sink, a relational loader, and an MQTT control plane for
//! starting and stopping jobs remotely.

pub mod config;
pub mod control;
pub mod crawler;
pub mod loader;
pub mod session;
pub mod sink;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Sink error: {0}")]
    Sink(#[from] sink::SinkError),

    #[error("Loader error: {0}")]
    Loader(#[from] loader::LoaderError),

    #[error("Missing prerequisite artifact: {path} (run a discovery job first)")]
    MissingPrerequisite { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Browser-session errors
///
/// `Create` covers failures to open a new session (driver endpoint down,
/// capability rejection). `Command` covers failures of an established
/// session (crashed browser process, dropped connection); the dispatcher
/// treats these as grounds to destroy the session and retry with a fresh
/// one.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to create browser session: {0}")]
    Create(String),

    #[error("Browser session command failed: {0}")]
    Command(String),
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Result type alias for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

// Re-export commonly used types
pub use config::Config;
pub use control::{JobMode, JobState};
pub use crawler::{FieldRow, PageContent, ScrapeResult};
pub use url::{is_product_like, normalize_url};
