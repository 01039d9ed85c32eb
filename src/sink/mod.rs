//! Output sink files
//!
//! The row sink is an append-only CSV consumed incrementally by the
//! loader; the product-URL list hands the discovery result to product
//! jobs.

mod writer;

pub use writer::{completed_urls, read_product_urls, write_product_urls, SinkWriter};

use thiserror::Error;

/// Errors that can occur while writing or scanning sink files
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;
