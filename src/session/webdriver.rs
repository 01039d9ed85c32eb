//! WebDriver-backed browser sessions
//!
//! Connects to a WebDriver endpoint (chromedriver) and opens one browser
//! session per `create` call, configured headless with a fixed user agent.

use crate::config::BrowserConfig;
use crate::session::{BrowserSession, SessionFactory};
use crate::{SessionError, SessionResult};
use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Factory opening WebDriver sessions against a chromedriver endpoint
pub struct WebDriverFactory {
    webdriver_url: String,
    capabilities: Map<String, Value>,
}

impl WebDriverFactory {
    /// Builds a factory from the browser configuration
    pub fn new(config: &BrowserConfig) -> Self {
        let mut args = vec![
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--log-level=3".to_string(),
            format!("user-agent={}", config.user_agent),
        ];
        if config.headless {
            // The legacy headless mode is blocked by some catalog sites
            args.push("--headless=new".to_string());
        }

        let mut capabilities = Map::new();
        capabilities.insert("goog:chromeOptions".to_string(), json!({ "args": args }));

        Self {
            webdriver_url: config.webdriver_url.clone(),
            capabilities,
        }
    }
}

#[async_trait]
impl SessionFactory for WebDriverFactory {
    async fn create(&self) -> SessionResult<Box<dyn BrowserSession>> {
        let client = ClientBuilder::native()
            .capabilities(self.capabilities.clone())
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| SessionError::Create(e.to_string()))?;

        tracing::debug!("Opened WebDriver session at {}", self.webdriver_url);
        Ok(Box::new(WebDriverSession { client }))
    }
}

/// A live WebDriver session
pub struct WebDriverSession {
    client: Client,
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn goto(&mut self, url: &str) -> SessionResult<()> {
        self.client
            .goto(url)
            .await
            .map_err(|e| SessionError::Command(e.to_string()))
    }

    async fn wait_for_markup(&mut self, selector: &str, timeout: Duration) -> SessionResult<bool> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(selector))
            .await
        {
            Ok(_) => Ok(true),
            Err(CmdError::WaitTimeout) => Ok(false),
            Err(e) => Err(SessionError::Command(e.to_string())),
        }
    }

    async fn page_source(&mut self) -> SessionResult<String> {
        self.client
            .source()
            .await
            .map_err(|e| SessionError::Command(e.to_string()))
    }

    async fn is_alive(&mut self) -> bool {
        // Any cheap round trip works as a liveness probe
        self.client.current_url().await.is_ok()
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.client.close().await {
            tracing::debug!("Error closing WebDriver session: {}", e);
        }
    }
}
