use crate::config::types::{BrokerConfig, BrowserConfig, Config, CrawlerConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_browser_config(&config.browser)?;
    validate_broker_config(&config.broker)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl behavior configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let start = Url::parse(&config.start_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("start-url: {}", e)))?;
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("base-url: {}", e)))?;

    if start.host_str() != base.host_str() {
        return Err(ConfigError::Validation(format!(
            "start-url host '{}' does not match base-url host '{}'",
            start.host_str().unwrap_or(""),
            base.host_str().unwrap_or("")
        )));
    }

    if config.allowed_locale.is_empty() {
        return Err(ConfigError::Validation(
            "allowed-locale cannot be empty".to_string(),
        ));
    }

    if config.max_sessions < 1 || config.max_sessions > 32 {
        return Err(ConfigError::Validation(format!(
            "max-sessions must be between 1 and 32, got {}",
            config.max_sessions
        )));
    }

    // Worker concurrency and session capacity are matched 1:1; a task
    // without a session would just block inside the pool.
    if config.max_concurrency < 1 || config.max_concurrency > config.max_sessions {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and max-sessions ({}), got {}",
            config.max_sessions, config.max_concurrency
        )));
    }

    if config.discovery_passes < 1 || config.discovery_passes > 10 {
        return Err(ConfigError::Validation(format!(
            "discovery-passes must be between 1 and 10, got {}",
            config.discovery_passes
        )));
    }

    if config.retry_budget > 10 {
        return Err(ConfigError::Validation(format!(
            "retry-budget must be <= 10, got {}",
            config.retry_budget
        )));
    }

    if config.page_wait_timeout_ms < 1000 {
        return Err(ConfigError::Validation(format!(
            "page-wait-timeout-ms must be >= 1000ms, got {}ms",
            config.page_wait_timeout_ms
        )));
    }

    Ok(())
}

/// Validates browser configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    Url::parse(&config.webdriver_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("webdriver-url: {}", e)))?;

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates control-plane configuration
fn validate_broker_config(config: &BrokerConfig) -> Result<(), ConfigError> {
    if config.host.is_empty() {
        return Err(ConfigError::Validation(
            "broker host cannot be empty".to_string(),
        ));
    }

    if config.command_topic.is_empty() || config.status_topic.is_empty() {
        return Err(ConfigError::Validation(
            "broker topics cannot be empty".to_string(),
        ));
    }

    if config.command_topic == config.status_topic {
        return Err(ConfigError::Validation(
            "command-topic and status-topic must differ".to_string(),
        ));
    }

    if config.reconnect_secs < 1 {
        return Err(ConfigError::Validation(
            "reconnect-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output paths
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.product_urls_path.is_empty()
        || config.sink_path.is_empty()
        || config.database_path.is_empty()
    {
        return Err(ConfigError::Validation(
            "output paths cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn test_valid_config_passes() {
        let config = test_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_sessions_rejected() {
        let mut config = test_config();
        config.crawler.max_sessions = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_concurrency_above_sessions_rejected() {
        let mut config = test_config();
        config.crawler.max_concurrency = config.crawler.max_sessions + 1;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_host_mismatch_rejected() {
        let mut config = test_config();
        config.crawler.start_url = "https://other-site.net/BR/en/".to_string();
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_equal_topics_rejected() {
        let mut config = test_config();
        config.broker.status_topic = config.broker.command_topic.clone();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_short_page_wait_rejected() {
        let mut config = test_config();
        config.crawler.page_wait_timeout_ms = 100;
        assert!(validate(&config).is_err());
    }
}
