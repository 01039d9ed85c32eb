//! Crawl engine: frontier tracking, page extraction, dispatch, scheduling
//!
//! The scheduler owns the frontier and a bounded set of in-flight page
//! tasks; the dispatcher runs one fetch+classify+extract operation per
//! URL over a pooled browser session; the extractor turns page markup
//! into either follow links or field rows, never both.

mod dispatcher;
mod extract;
mod frontier;
mod scheduler;

pub use dispatcher::Dispatcher;
pub use extract::{Extractor, DISCOVERY_WAIT_SELECTOR, PRODUCT_WAIT_SELECTOR};
pub use frontier::Frontier;
pub use scheduler::{run_discovery, run_extraction, Progress, ProgressTx};

use url::Url;

/// One extracted field of a product page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRow {
    /// URL of the page the field was extracted from
    pub source_url: String,

    /// Feature name (e.g. "Power", "Voltage")
    pub feature: String,

    /// Feature value
    pub value: String,
}

/// What a page turned out to contain
///
/// A page is classified as exactly one of navigation or leaf: navigation
/// pages contribute follow links and no rows, leaf pages contribute rows
/// and no follow links.
#[derive(Debug, Clone)]
pub enum PageContent {
    /// A navigation node with links to follow
    Navigation { urls: Vec<Url> },

    /// A leaf/product node with extracted field rows
    Leaf { rows: Vec<FieldRow> },
}

impl PageContent {
    /// Links to follow; empty for leaf pages
    pub fn next_urls(&self) -> &[Url] {
        match self {
            PageContent::Navigation { urls } => urls,
            PageContent::Leaf { .. } => &[],
        }
    }

    /// Extracted rows; empty for navigation pages
    pub fn rows(&self) -> &[FieldRow] {
        match self {
            PageContent::Navigation { .. } => &[],
            PageContent::Leaf { rows } => rows,
        }
    }
}

/// Outcome of one `scrape` operation
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    /// The URL that was scraped
    pub url: Url,

    /// The classified page content
    pub content: PageContent,
}

impl ScrapeResult {
    /// The "gave up" value: no links, no rows
    ///
    /// Returned after the retry budget is exhausted so one bad page never
    /// aborts a crawl.
    pub fn empty(url: Url) -> Self {
        Self {
            url,
            content: PageContent::Navigation { urls: Vec::new() },
        }
    }
}
