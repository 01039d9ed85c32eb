//! Resumable append-only row sink
//!
//! Rows are `(Product URL, Feature, Value)` triples. The file is opened
//! in append mode, the header is written only when the file is new, and
//! every appended batch is flushed so a crash loses at most the batch in
//! flight. `completed_urls` reconstructs which source URLs already hold
//! rows, which is how a restarted product job skips finished work.

use crate::crawler::FieldRow;
use crate::sink::SinkResult;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use url::Url;

const SINK_HEADER: [&str; 3] = ["Product URL", "Feature", "Value"];
const URL_LIST_HEADER: [&str; 1] = ["product_url"];

/// Append-only CSV writer for extracted field rows
pub struct SinkWriter {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl SinkWriter {
    /// Opens the sink at `path`, creating it (and its parent directory)
    /// if needed
    ///
    /// The header row is written only when the sink does not exist yet or
    /// is empty, so reopening an interrupted sink keeps appending after
    /// the last flushed batch.
    pub fn open(path: &Path) -> SinkResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let needs_header = match std::fs::metadata(path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(SINK_HEADER)?;
            writer.flush()?;
        }

        Ok(Self {
            writer,
            path: path.to_path_buf(),
        })
    }

    /// Appends a batch of rows and flushes them to disk
    pub fn append(&mut self, rows: &[FieldRow]) -> SinkResult<()> {
        for row in rows {
            self.writer
                .write_record([&row.source_url, &row.feature, &row.value])?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Path this sink writes to
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Scans an existing sink for source URLs that already hold rows
///
/// Returns the empty set when the sink does not exist.
pub fn completed_urls(path: &Path) -> SinkResult<HashSet<String>> {
    let mut done = HashSet::new();
    if !path.exists() {
        return Ok(done);
    }

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    for record in reader.records() {
        let record = record?;
        if let Some(source_url) = record.get(0) {
            done.insert(source_url.to_string());
        }
    }
    Ok(done)
}

/// Writes the discovered product-URL list, replacing any previous one
pub fn write_product_urls(path: &Path, urls: &[Url]) -> SinkResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(URL_LIST_HEADER)?;
    for url in urls {
        writer.write_record([url.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a previously written product-URL list
///
/// Rows that no longer parse as URLs are skipped with a warning rather
/// than failing the whole job.
pub fn read_product_urls(path: &Path) -> SinkResult<Vec<Url>> {
    let mut urls = Vec::new();
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    for record in reader.records() {
        let record = record?;
        let Some(raw) = record.get(0) else { continue };
        match Url::parse(raw) {
            Ok(url) => urls.push(url),
            Err(e) => tracing::warn!("Skipping unparseable product URL '{}': {}", raw, e),
        }
    }
    Ok(urls)
}
