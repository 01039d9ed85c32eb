//! Shared fixtures for integration tests
//!
//! Jobs run against a scripted browser-session factory serving pages
//! from an in-memory map, so the full pipeline is exercised without a
//! WebDriver endpoint.

use async_trait::async_trait;
use indumine_crawler::config::{
    BrokerConfig, BrowserConfig, Config, CrawlerConfig, OutputConfig,
};
use indumine_crawler::session::{BrowserSession, SessionFactory};
use indumine_crawler::SessionResult;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// In-memory site served to mock sessions
#[derive(Default)]
pub struct MockSite {
    pages: HashMap<String, String>,
    /// URLs whose expected-markup wait times out
    slow: HashSet<String>,
}

impl MockSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Registers a page whose markup wait times out but whose (partial)
    /// markup is still served
    pub fn slow_page(mut self, url: &str, html: &str) -> Self {
        self.slow.insert(url.to_string());
        self.page(url, html)
    }

    pub fn into_factory(self) -> Arc<MockFactory> {
        Arc::new(MockFactory {
            site: Arc::new(self),
        })
    }
}

pub struct MockFactory {
    site: Arc<MockSite>,
}

#[async_trait]
impl SessionFactory for MockFactory {
    async fn create(&self) -> SessionResult<Box<dyn BrowserSession>> {
        Ok(Box::new(MockSession {
            site: self.site.clone(),
            current: String::new(),
        }))
    }
}

struct MockSession {
    site: Arc<MockSite>,
    current: String,
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn goto(&mut self, url: &str) -> SessionResult<()> {
        self.current = url.to_string();
        Ok(())
    }

    async fn wait_for_markup(&mut self, _selector: &str, _timeout: Duration) -> SessionResult<bool> {
        Ok(!self.site.slow.contains(&self.current))
    }

    async fn page_source(&mut self) -> SessionResult<String> {
        Ok(self
            .site
            .pages
            .get(&self.current)
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }

    async fn is_alive(&mut self) -> bool {
        true
    }

    async fn close(self: Box<Self>) {}
}

/// Builds a config whose output artifacts live under `dir`
pub fn test_config(dir: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            start_url: "https://www.example-catalog.net/catalog/BR/en/".to_string(),
            base_url: "https://www.example-catalog.net".to_string(),
            allowed_locale: "/BR/en/".to_string(),
            max_sessions: 3,
            max_concurrency: 3,
            discovery_passes: 2,
            retry_budget: 1,
            page_wait_timeout_ms: 1_000,
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
            product_urls_path: dir.join("product_urls.csv").to_string_lossy().into_owned(),
            sink_path: dir.join("sink.csv").to_string_lossy().into_owned(),
            database_path: dir.join("catalog.db").to_string_lossy().into_owned(),
        },
    }
}
