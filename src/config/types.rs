use serde::Deserialize;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub browser: BrowserConfig,
    pub broker: BrokerConfig,
    pub output: OutputConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URL the discovery crawl starts from
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Site origin; discovered links outside it are dropped
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path segment a URL must contain to be crawled (e.g. "/BR/en/")
    #[serde(rename = "allowed-locale")]
    pub allowed_locale: String,

    /// Maximum number of live browser sessions
    #[serde(rename = "max-sessions")]
    pub max_sessions: u32,

    /// Maximum number of in-flight page tasks
    #[serde(rename = "max-concurrency")]
    pub max_concurrency: u32,

    /// Number of discovery passes over the link graph
    #[serde(rename = "discovery-passes", default = "default_discovery_passes")]
    pub discovery_passes: u32,

    /// Retries with a fresh session after a session-level failure
    #[serde(rename = "retry-budget", default = "default_retry_budget")]
    pub retry_budget: u32,

    /// Timeout for the expected-markup wait after navigation (milliseconds)
    #[serde(rename = "page-wait-timeout-ms", default = "default_page_wait_timeout_ms")]
    pub page_wait_timeout_ms: u64,

    /// Pause before retrying after a failed session acquire (milliseconds)
    #[serde(rename = "acquire-backoff-ms", default = "default_acquire_backoff_ms")]
    pub acquire_backoff_ms: u64,
}

/// Headless browser configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver endpoint (e.g. a chromedriver instance)
    #[serde(rename = "webdriver-url")]
    pub webdriver_url: String,

    /// User agent presented by the browser
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Run the browser headless
    #[serde(default = "default_headless")]
    pub headless: bool,
}

/// MQTT control-plane configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    pub host: String,

    #[serde(default = "default_broker_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(rename = "client-id", default = "default_client_id")]
    pub client_id: String,

    /// Topic commands arrive on
    #[serde(rename = "command-topic", default = "default_command_topic")]
    pub command_topic: String,

    /// Topic status payloads are published to
    #[serde(rename = "status-topic", default = "default_status_topic")]
    pub status_topic: String,

    /// Fixed backoff between reconnect attempts (seconds)
    #[serde(rename = "reconnect-secs", default = "default_reconnect_secs")]
    pub reconnect_secs: u64,
}

/// Output artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Discovered product-URL list (written by discovery, read by product jobs)
    #[serde(rename = "product-urls-path")]
    pub product_urls_path: String,

    /// Append-only extracted-rows sink
    #[serde(rename = "sink-path")]
    pub sink_path: String,

    /// SQLite database the loader upserts into
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_discovery_passes() -> u32 {
    2
}

fn default_retry_budget() -> u32 {
    2
}

fn default_page_wait_timeout_ms() -> u64 {
    15_000
}

fn default_acquire_backoff_ms() -> u64 {
    500
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36"
        .to_string()
}

fn default_headless() -> bool {
    true
}

fn default_broker_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "indumine-crawler".to_string()
}

fn default_command_topic() -> String {
    "indumine/crawler/command".to_string()
}

fn default_status_topic() -> String {
    "indumine/crawler/status".to_string()
}

fn default_reconnect_secs() -> u64 {
    5
}
