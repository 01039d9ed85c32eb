//! Configuration module
//!
//! Handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use indumine_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Session capacity: {}", config.crawler.max_sessions);
//! ```

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{BrokerConfig, BrowserConfig, Config, CrawlerConfig, OutputConfig};

/// Builds a small valid configuration for unit tests
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        crawler: CrawlerConfig {
            start_url: "https://www.example-catalog.net/institutional/BR/en/".to_string(),
            base_url: "https://www.example-catalog.net".to_string(),
            allowed_locale: "/BR/en/".to_string(),
            max_sessions: 4,
            max_concurrency: 4,
            discovery_passes: 2,
            retry_budget: 2,
            page_wait_timeout_ms: 15_000,
            acquire_backoff_ms: 10,
        },
        browser: BrowserConfig {
            webdriver_url: "http://localhost:4444".to_string(),
            user_agent: "TestAgent/1.0".to_string(),
            headless: true,
        },
        broker: BrokerConfig {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            client_id: "indumine-test".to_string(),
            command_topic: "indumine/crawler/command".to_string(),
            status_topic: "indumine/crawler/status".to_string(),
            reconnect_secs: 5,
        },
        output: OutputConfig {
            product_urls_path: "./data/product_urls.csv".to_string(),
            sink_path: "./data/products.csv".to_string(),
            database_path: "./data/catalog.db".to_string(),
        },
    }
}
