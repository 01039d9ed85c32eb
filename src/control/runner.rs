//! Single-job execution
//!
//! One `execute_job` call owns the whole lifecycle of a job: build the
//! session pool, run the phases the mode asks for, drain the pool. Every
//! exit path drains; the caller decides how to report the outcome.

use crate::config::Config;
use crate::control::JobMode;
use crate::crawler::{
    run_discovery, run_extraction, Dispatcher, Extractor, ProgressTx, DISCOVERY_WAIT_SELECTOR,
    PRODUCT_WAIT_SELECTOR,
};
use crate::loader::CatalogStore;
use crate::session::{SessionFactory, SessionPool};
use crate::sink::{self, SinkWriter};
use crate::url::{is_product_like, normalize_url};
use crate::{CrawlerError, Result};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// How a job ended, short of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Cancelled,
}

/// Runs one job to completion, cancellation, or failure
///
/// Discovery writes the product-URL list; product extraction reads it,
/// skips URLs the sink already covers, and loads the sink into the
/// database afterwards. `Full` chains both phases.
pub async fn execute_job(
    config: &Config,
    mode: JobMode,
    factory: Arc<dyn SessionFactory>,
    cancel: &CancellationToken,
    progress: ProgressTx,
) -> Result<JobOutcome> {
    tracing::info!("Executing {} job", mode);
    let pool = Arc::new(SessionPool::new(
        factory,
        config.crawler.max_sessions as usize,
    ));

    let result = run_phases(config, mode, &pool, cancel, &progress).await;
    pool.drain().await;

    result.map(|()| {
        if cancel.is_cancelled() {
            JobOutcome::Cancelled
        } else {
            JobOutcome::Completed
        }
    })
}

async fn run_phases(
    config: &Config,
    mode: JobMode,
    pool: &Arc<SessionPool>,
    cancel: &CancellationToken,
    progress: &ProgressTx,
) -> Result<()> {
    let base = normalize_url(&config.crawler.base_url).map_err(CrawlerError::Url)?;
    let extractor = Arc::new(Extractor::new(base));

    if matches!(mode, JobMode::Discovery | JobMode::Full) {
        let dispatcher = Dispatcher::new(
            pool.clone(),
            extractor.clone(),
            DISCOVERY_WAIT_SELECTOR,
            &config.crawler,
        );
        let discovered = run_discovery(&dispatcher, &config.crawler, cancel, progress).await?;

        let products: Vec<Url> = discovered
            .into_iter()
            .filter(is_product_like)
            .collect();
        sink::write_product_urls(Path::new(&config.output.product_urls_path), &products)
            .map_err(CrawlerError::Sink)?;
        tracing::info!(
            "Discovery finished: {} product URLs written to {}",
            products.len(),
            config.output.product_urls_path
        );
    }

    if cancel.is_cancelled() {
        return Ok(());
    }

    if matches!(mode, JobMode::Product | JobMode::Full) {
        let url_list = Path::new(&config.output.product_urls_path);
        if !url_list.exists() {
            return Err(CrawlerError::MissingPrerequisite {
                path: url_list.to_path_buf(),
            });
        }

        let sink_path = Path::new(&config.output.sink_path);
        let done = sink::completed_urls(sink_path).map_err(CrawlerError::Sink)?;
        let urls: Vec<Url> = sink::read_product_urls(url_list)
            .map_err(CrawlerError::Sink)?
            .into_iter()
            .filter(|u| !done.contains(u.as_str()))
            .collect();
        if !done.is_empty() {
            tracing::info!("Resuming: {} URLs already in the sink", done.len());
        }

        let mut sink = SinkWriter::open(sink_path).map_err(CrawlerError::Sink)?;
        let dispatcher = Dispatcher::new(
            pool.clone(),
            extractor,
            PRODUCT_WAIT_SELECTOR,
            &config.crawler,
        );
        let processed =
            run_extraction(&dispatcher, &config.crawler, urls, &mut sink, cancel, progress)
                .await?;
        tracing::info!("Extraction finished: {} pages processed", processed);

        let mut store = CatalogStore::new(Path::new(&config.output.database_path))?;
        let loaded = store.load_sink(sink_path, &config.crawler.allowed_locale)?;
        tracing::info!("Loaded {} products into the database", loaded);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::BrowserSession;
    use crate::SessionResult;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

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

    fn site() -> Arc<HashMap<String, String>> {
        let mut pages = HashMap::new();
        pages.insert(
            "https://www.example-catalog.net/catalog/BR/en/".to_string(),
            r#"<a href="/catalog/BR/en/motors/w22/p/1">W22</a>"#.to_string(),
        );
        pages.insert(
            "https://www.example-catalog.net/catalog/BR/en/motors/w22/p/1".to_string(),
            r#"
                <h1 class="product-card-title">W22 Motor</h1>
                <small class="product-card-info">Product: 13009005</small>
                <div class="product-info-specs"><table class="table">
                  <tr><th>Power</th><td>10 kW</td></tr>
                </table></div>
            "#
            .to_string(),
        );
        Arc::new(pages)
    }

    fn test_setup(dir: &TempDir) -> (Config, Arc<dyn SessionFactory>) {
        let mut config = crate::config::test_config();
        config.crawler.start_url = "https://www.example-catalog.net/catalog/BR/en/".to_string();
        config.output.product_urls_path = dir
            .path()
            .join("product_urls.csv")
            .to_string_lossy()
            .into_owned();
        config.output.sink_path = dir.path().join("sink.csv").to_string_lossy().into_owned();
        config.output.database_path = dir.path().join("catalog.db").to_string_lossy().into_owned();
        (config, Arc::new(MapFactory { pages: site() }))
    }

    #[tokio::test]
    async fn test_full_job_discovers_extracts_and_loads() {
        let dir = TempDir::new().unwrap();
        let (config, factory) = test_setup(&dir);
        let cancel = CancellationToken::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let outcome = execute_job(&config, JobMode::Full, factory, &cancel, tx)
            .await
            .unwrap();
        assert_eq!(outcome, JobOutcome::Completed);

        // Discovery wrote the product-URL list
        let urls = sink::read_product_urls(Path::new(&config.output.product_urls_path)).unwrap();
        assert!(urls
            .iter()
            .any(|u| u.as_str().ends_with("/motors/w22/p/1")));

        // Extraction filled the sink
        let done = sink::completed_urls(Path::new(&config.output.sink_path)).unwrap();
        assert!(done.contains("https://www.example-catalog.net/catalog/BR/en/motors/w22/p/1"));

        // The loader upserted the product
        let store = CatalogStore::new(Path::new(&config.output.database_path)).unwrap();
        assert_eq!(store.product_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_product_job_without_url_list_fails() {
        let dir = TempDir::new().unwrap();
        let (config, factory) = test_setup(&dir);
        let cancel = CancellationToken::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = execute_job(&config, JobMode::Product, factory, &cancel, tx)
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlerError::MissingPrerequisite { .. }));
    }

    #[tokio::test]
    async fn test_product_job_skips_completed_urls() {
        let dir = TempDir::new().unwrap();
        let (config, factory) = test_setup(&dir);
        let product_url = "https://www.example-catalog.net/catalog/BR/en/motors/w22/p/1";

        sink::write_product_urls(
            Path::new(&config.output.product_urls_path),
            &[Url::parse(product_url).unwrap()],
        )
        .unwrap();

        // The sink already covers the only product URL
        let mut sink = SinkWriter::open(Path::new(&config.output.sink_path)).unwrap();
        sink.append(&[crate::crawler::FieldRow {
            source_url: product_url.to_string(),
            feature: "Product Code".to_string(),
            value: "13009005".to_string(),
        }])
        .unwrap();
        drop(sink);

        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = execute_job(&config, JobMode::Product, factory, &cancel, tx)
            .await
            .unwrap();
        assert_eq!(outcome, JobOutcome::Completed);

        // Nothing was dispatched, so no progress was reported
        assert!(rx.try_recv().is_err());

        // The pre-existing sink row still made it to the database
        let store = CatalogStore::new(Path::new(&config.output.database_path)).unwrap();
        assert_eq!(store.product_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_ends_cancelled() {
        let dir = TempDir::new().unwrap();
        let (config, factory) = test_setup(&dir);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, _rx) = mpsc::unbounded_channel();

        let outcome = execute_job(&config, JobMode::Full, factory, &cancel, tx)
            .await
            .unwrap();
        assert_eq!(outcome, JobOutcome::Cancelled);
    }
}
