//! Cooperative crawl scheduling
//!
//! Both phases run the same loop shape: keep up to `max-concurrency` page
//! tasks in flight, react to whichever finishes first, and fold its
//! output back into the frontier or the sink. Blocking browser I/O lives
//! inside the spawned tasks; the loop itself only joins and bookkeeps.
//! Cancellation stops new dispatch and lets in-flight tasks finish.

use crate::config::CrawlerConfig;
use crate::crawler::{Dispatcher, Frontier, PageContent, ScrapeResult};
use crate::sink::SinkWriter;
use crate::url::{is_candidate, normalize_url};
use crate::{CrawlerError, Result};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Progress snapshot sent after every completed page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Pages completed so far in the current phase
    pub processed: u64,

    /// Best current estimate of total pages in the phase; grows as
    /// discovery finds more links
    pub total_estimate: u64,
}

/// Channel end progress snapshots are sent on
pub type ProgressTx = mpsc::UnboundedSender<Progress>;

/// Runs the discovery phase and returns every crawlable URL found
///
/// Performs `discovery-passes` passes; each pass reseeds the frontier
/// with everything discovered so far, since link discovery on a
/// script-driven site is not complete in one traversal.
pub async fn run_discovery(
    dispatcher: &Dispatcher,
    config: &CrawlerConfig,
    cancel: &CancellationToken,
    progress: &ProgressTx,
) -> Result<Vec<Url>> {
    let base = normalize_url(&config.base_url).map_err(CrawlerError::Url)?;
    let start = normalize_url(&config.start_url).map_err(CrawlerError::Url)?;

    let mut discovered: HashSet<Url> = HashSet::new();
    discovered.insert(start);

    for pass in 1..=config.discovery_passes {
        if cancel.is_cancelled() {
            break;
        }
        tracing::info!(
            "Discovery pass {}/{} over {} known URLs",
            pass,
            config.discovery_passes,
            discovered.len()
        );

        let before = discovered.len();
        run_discovery_pass(dispatcher, config, &base, &mut discovered, cancel, progress).await;
        tracing::info!(
            "Pass {} finished: {} URLs known ({} new)",
            pass,
            discovered.len(),
            discovered.len() - before
        );

        if discovered.len() == before {
            // The link graph is stable, further passes cannot add anything
            break;
        }
    }

    let mut urls: Vec<Url> = discovered.into_iter().collect();
    urls.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    Ok(urls)
}

async fn run_discovery_pass(
    dispatcher: &Dispatcher,
    config: &CrawlerConfig,
    base: &Url,
    discovered: &mut HashSet<Url>,
    cancel: &CancellationToken,
    progress: &ProgressTx,
) {
    let mut frontier = Frontier::new();
    for url in discovered.iter() {
        frontier.offer(url.clone());
    }

    let mut tasks: JoinSet<ScrapeResult> = JoinSet::new();
    let mut processed = 0u64;

    loop {
        // Top up to the concurrency cap, unless cancelled
        while tasks.len() < config.max_concurrency as usize && !cancel.is_cancelled() {
            let Some(url) = frontier.next() else { break };
            let dispatcher = dispatcher.clone();
            tasks.spawn(async move { dispatcher.scrape(url).await });
        }

        // React to whichever in-flight page finishes first
        let Some(joined) = tasks.join_next().await else {
            break;
        };
        processed += 1;

        match joined {
            Ok(result) => {
                for link in result.content.next_urls() {
                    if !is_candidate(link, base, &config.allowed_locale) {
                        continue;
                    }
                    discovered.insert(link.clone());
                    frontier.offer(link.clone());
                }
            }
            Err(e) => tracing::error!("Page task panicked: {}", e),
        }

        let total_estimate = processed + tasks.len() as u64 + frontier.pending_len() as u64;
        let _ = progress.send(Progress {
            processed,
            total_estimate,
        });
    }
}

/// Runs the extraction phase over a fixed URL list, appending leaf rows
/// to the sink as each page completes
///
/// Returns the number of pages processed. Rows are flushed per page, so
/// an interrupted job loses at most the page in flight.
pub async fn run_extraction(
    dispatcher: &Dispatcher,
    config: &CrawlerConfig,
    urls: Vec<Url>,
    sink: &mut SinkWriter,
    cancel: &CancellationToken,
    progress: &ProgressTx,
) -> Result<u64> {
    let total_estimate = urls.len() as u64;
    let mut queue = urls.into_iter();
    let mut tasks: JoinSet<ScrapeResult> = JoinSet::new();
    let mut processed = 0u64;

    loop {
        while tasks.len() < config.max_concurrency as usize && !cancel.is_cancelled() {
            let Some(url) = queue.next() else { break };
            let dispatcher = dispatcher.clone();
            tasks.spawn(async move { dispatcher.scrape(url).await });
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };
        processed += 1;

        match joined {
            Ok(result) => {
                if let PageContent::Leaf { rows } = &result.content {
                    tracing::info!("Extracted {} rows from {}", rows.len(), result.url);
                    sink.append(rows).map_err(CrawlerError::Sink)?;
                } else {
                    tracing::warn!("Expected a product page at {}, found none", result.url);
                }
            }
            Err(e) => tracing::error!("Page task panicked: {}", e),
        }

        let _ = progress.send(Progress {
            processed,
            total_estimate,
        });
    }

    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{Extractor, DISCOVERY_WAIT_SELECTOR};
    use crate::session::{BrowserSession, SessionFactory, SessionPool};
    use crate::sink;
    use crate::SessionResult;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Session serving pages from a fixed URL->HTML map
    struct MapSession {
        pages: Arc<HashMap<String, String>>,
        current: String,
    }

    #[async_trait]
    impl BrowserSession for MapSession {
        async fn goto(&mut self, url: &str) -> SessionResult<()> {
            self.current = url.to_string();
            Ok(())
        }

        async fn wait_for_markup(
            &mut self,
            _selector: &str,
            _timeout: Duration,
        ) -> SessionResult<bool> {
            Ok(true)
        }

        async fn page_source(&mut self) -> SessionResult<String> {
            Ok(self
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

    struct MapFactory {
        pages: Arc<HashMap<String, String>>,
    }

    #[async_trait]
    impl SessionFactory for MapFactory {
        async fn create(&self) -> SessionResult<Box<dyn BrowserSession>> {
            Ok(Box::new(MapSession {
                pages: self.pages.clone(),
                current: String::new(),
            }))
        }
    }

    const PRODUCT_PAGE: &str = r#"
        <h1 class="product-card-title">W22 Motor</h1>
        <div class="product-info-specs"><table class="table">
          <tr><th>Power</th><td>10 kW</td></tr>
        </table></div>
    "#;

    fn site() -> Arc<HashMap<String, String>> {
        let mut pages = HashMap::new();
        pages.insert(
            "https://www.example-catalog.net/catalog/BR/en/".to_string(),
            r#"<a href="/catalog/BR/en/motors">B</a>
               <a href="/catalog/BR/en/drives">C</a>
               <a href="https://elsewhere.example/x">off-site</a>"#
                .to_string(),
        );
        pages.insert(
            "https://www.example-catalog.net/catalog/BR/en/motors".to_string(),
            r#"<a href="/catalog/BR/en/">A</a>"#.to_string(),
        );
        pages.insert(
            "https://www.example-catalog.net/catalog/BR/en/drives".to_string(),
            r#"<a href="/catalog/BR/en/w22/p/1">D</a>"#.to_string(),
        );
        pages.insert(
            "https://www.example-catalog.net/catalog/BR/en/w22/p/1".to_string(),
            PRODUCT_PAGE.to_string(),
        );
        Arc::new(pages)
    }

    fn dispatcher(pages: Arc<HashMap<String, String>>) -> Dispatcher {
        let config = crate::config::test_config();
        let pool = Arc::new(SessionPool::new(Arc::new(MapFactory { pages }), 2));
        let base = Url::parse(&config.crawler.base_url).unwrap();
        Dispatcher::new(
            pool,
            Arc::new(Extractor::new(base)),
            DISCOVERY_WAIT_SELECTOR,
            &config.crawler,
        )
    }

    fn discovery_config() -> crate::config::Config {
        let mut config = crate::config::test_config();
        config.crawler.start_url = "https://www.example-catalog.net/catalog/BR/en/".to_string();
        config
    }

    #[tokio::test]
    async fn test_discovery_finds_transitive_links() {
        let config = discovery_config();
        let dispatcher = dispatcher(site());
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let urls = run_discovery(&dispatcher, &config.crawler, &cancel, &tx)
            .await
            .unwrap();

        let strs: Vec<&str> = urls.iter().map(Url::as_str).collect();
        assert_eq!(
            strs,
            vec![
                "https://www.example-catalog.net/catalog/BR/en/",
                "https://www.example-catalog.net/catalog/BR/en/drives",
                "https://www.example-catalog.net/catalog/BR/en/motors",
                "https://www.example-catalog.net/catalog/BR/en/w22/p/1",
            ]
        );

        // The product page was visited but contributed no links
        assert!(!strs.iter().any(|s| s.contains("elsewhere")));

        // Progress was reported and the final estimate matched completion
        let mut last = None;
        while let Ok(p) = rx.try_recv() {
            last = Some(p);
        }
        let last = last.unwrap();
        assert_eq!(last.processed, last.total_estimate);
    }

    #[tokio::test]
    async fn test_discovery_cancellation_stops_dispatch() {
        let config = discovery_config();
        let dispatcher = dispatcher(site());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, _rx) = mpsc::unbounded_channel();

        let urls = run_discovery(&dispatcher, &config.crawler, &cancel, &tx)
            .await
            .unwrap();

        // Only the seed survives; nothing was dispatched
        assert_eq!(urls.len(), 1);
    }

    #[tokio::test]
    async fn test_extraction_appends_leaf_rows() {
        let config = crate::config::test_config();
        let dispatcher = dispatcher(site());
        let cancel = CancellationToken::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let dir = TempDir::new().unwrap();
        let sink_path = dir.path().join("sink.csv");
        let mut sink = SinkWriter::open(&sink_path).unwrap();

        let urls = vec![
            Url::parse("https://www.example-catalog.net/catalog/BR/en/w22/p/1").unwrap(),
        ];
        let processed = run_extraction(&dispatcher, &config.crawler, urls, &mut sink, &cancel, &tx)
            .await
            .unwrap();
        assert_eq!(processed, 1);

        let done = sink::completed_urls(&sink_path).unwrap();
        assert!(done.contains("https://www.example-catalog.net/catalog/BR/en/w22/p/1"));
    }
}
