//! Per-URL fetch+classify+extract operation
//!
//! One `scrape` call leases a session, navigates, waits for the expected
//! markup with a timeout, and classifies whatever markup is present. A
//! timed-out wait degrades gracefully: extraction still runs, but the
//! session is treated as suspect and destroyed on release. Session-level
//! failures destroy the session and retry with a fresh one up to the
//! retry budget; exhausting the budget yields an empty result instead of
//! an error, so no single page can abort a crawl.

use crate::config::CrawlerConfig;
use crate::crawler::{Extractor, PageContent, ScrapeResult};
use crate::session::{PooledSession, SessionPool};
use crate::SessionResult;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Runs fetch+classify+extract operations over pooled sessions
#[derive(Clone)]
pub struct Dispatcher {
    pool: Arc<SessionPool>,
    extractor: Arc<Extractor>,
    wait_selector: &'static str,
    wait_timeout: Duration,
    retry_budget: u32,
    acquire_backoff: Duration,
}

impl Dispatcher {
    /// Builds a dispatcher waiting for `wait_selector` on every page
    pub fn new(
        pool: Arc<SessionPool>,
        extractor: Arc<Extractor>,
        wait_selector: &'static str,
        config: &CrawlerConfig,
    ) -> Self {
        Self {
            pool,
            extractor,
            wait_selector,
            wait_timeout: Duration::from_millis(config.page_wait_timeout_ms),
            retry_budget: config.retry_budget,
            acquire_backoff: Duration::from_millis(config.acquire_backoff_ms),
        }
    }

    /// Fetches and classifies one page
    ///
    /// Never fails: after the retry budget is spent the page is reported
    /// as empty navigation and the crawl moves on.
    pub async fn scrape(&self, url: Url) -> ScrapeResult {
        for attempt in 0..=self.retry_budget {
            let mut lease = match self.pool.acquire().await {
                Ok(lease) => lease,
                Err(e) => {
                    tracing::warn!("Could not acquire session for {}: {}", url, e);
                    tokio::time::sleep(self.acquire_backoff).await;
                    continue;
                }
            };

            match self.fetch_page(&mut lease, &url).await {
                Ok((html, markup_found)) => {
                    // A timed-out wait leaves the session suspect; keep
                    // the page, drop the session.
                    self.pool.release(lease, markup_found).await;

                    let content = self.extractor.classify(&url, &html);
                    match &content {
                        PageContent::Navigation { urls } => {
                            tracing::debug!("{}: navigation, {} links", url, urls.len());
                        }
                        PageContent::Leaf { rows } => {
                            tracing::debug!("{}: leaf, {} rows", url, rows.len());
                        }
                    }
                    return ScrapeResult { url, content };
                }
                Err(e) => {
                    tracing::warn!(
                        "Session failure on {} (attempt {}/{}): {}",
                        url,
                        attempt + 1,
                        self.retry_budget + 1,
                        e
                    );
                    self.pool.release(lease, false).await;
                    tokio::time::sleep(self.acquire_backoff).await;
                }
            }
        }

        tracing::error!("Giving up on {} after {} attempts", url, self.retry_budget + 1);
        ScrapeResult::empty(url)
    }

    async fn fetch_page(
        &self,
        session: &mut PooledSession,
        url: &Url,
    ) -> SessionResult<(String, bool)> {
        session.goto(url.as_str()).await?;

        let markup_found = session
            .wait_for_markup(self.wait_selector, self.wait_timeout)
            .await?;
        if !markup_found {
            tracing::warn!(
                "Timed out waiting for '{}' on {}; extracting from partial page",
                self.wait_selector,
                url
            );
        }

        let html = session.page_source().await?;
        Ok((html, markup_found))
    }
}
