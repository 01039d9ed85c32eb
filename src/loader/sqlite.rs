//! SQLite catalog store
//!
//! Owns the database connection and implements the two loading
//! primitives: category get-or-create and product upsert. `load_sink`
//! ties them together, turning the flat sink rows into product records.

use crate::loader::schema::initialize_schema;
use crate::loader::{category_from_url, slugify, LoaderResult, ProductRecord, DEFAULT_CATEGORY};
use chrono::Utc;
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

/// Length of the URL-hash fallback product id
const HASH_ID_LEN: usize = 20;

/// SQLite-backed catalog database
pub struct CatalogStore {
    conn: Connection,
}

impl CatalogStore {
    /// Opens (or creates) the catalog database at `path`
    pub fn new(path: &Path) -> LoaderResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory store (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> LoaderResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Returns the id of the named category, creating it if needed
    ///
    /// Safe against concurrent creation of the same name: the insert
    /// ignores a uniqueness conflict and the follow-up select returns
    /// whichever row won.
    pub fn get_or_create_category(&mut self, name: &str) -> LoaderResult<i64> {
        let name = if name.trim().is_empty() {
            DEFAULT_CATEGORY
        } else {
            name
        };

        self.conn.execute(
            "INSERT OR IGNORE INTO categories (name, slug) VALUES (?1, ?2)",
            params![name, slugify(name)],
        )?;

        let id = self.conn.query_row(
            "SELECT id FROM categories WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Inserts the product or replaces every non-key column of the
    /// existing row with the same id
    pub fn upsert_product(&mut self, record: &ProductRecord) -> LoaderResult<()> {
        self.conn.execute(
            "INSERT INTO products (id, url, name, category_id, description, specs, images, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                 url = excluded.url,
                 name = excluded.name,
                 category_id = excluded.category_id,
                 description = excluded.description,
                 specs = excluded.specs,
                 images = excluded.images,
                 scraped_at = excluded.scraped_at",
            params![
                record.id,
                record.url,
                record.name,
                record.category_id,
                record.description,
                record.specs_json,
                record.images_json,
                record.scraped_at,
            ],
        )?;
        Ok(())
    }

    /// Loads the extracted-rows sink into the database
    ///
    /// Rows are grouped per product URL, regrouped into one record each,
    /// and upserted. Returns the number of products loaded. A missing
    /// sink loads zero products.
    pub fn load_sink(&mut self, sink_path: &Path, allowed_locale: &str) -> LoaderResult<usize> {
        if !sink_path.exists() {
            tracing::warn!("Sink {} not found, nothing to load", sink_path.display());
            return Ok(0);
        }

        let mut grouped: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(sink_path)
            .map_err(crate::sink::SinkError::Csv)?;
        for record in reader.records() {
            let record = record.map_err(crate::sink::SinkError::Csv)?;
            let (Some(url), Some(feature), Some(value)) =
                (record.get(0), record.get(1), record.get(2))
            else {
                continue;
            };
            if feature.is_empty() || value.is_empty() {
                continue;
            }
            grouped
                .entry(url.to_string())
                .or_default()
                .push((feature.to_string(), value.to_string()));
        }

        let mut loaded = 0;
        for (url, fields) in grouped {
            let record = self.build_record(&url, &fields, allowed_locale)?;
            self.upsert_product(&record)?;
            loaded += 1;
        }

        tracing::info!("Loaded {} products from {}", loaded, sink_path.display());
        Ok(loaded)
    }

    /// Number of products currently stored
    pub fn product_count(&self) -> LoaderResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count)
    }

    fn build_record(
        &mut self,
        url: &str,
        fields: &[(String, String)],
        allowed_locale: &str,
    ) -> LoaderResult<ProductRecord> {
        let mut specs: BTreeMap<&str, &str> = BTreeMap::new();
        let mut images: Vec<&str> = Vec::new();
        for (feature, value) in fields {
            if feature.starts_with("Image URL") {
                images.push(value);
            } else {
                specs.insert(feature, value);
            }
        }

        let category_name = match Url::parse(url) {
            Ok(parsed) => category_from_url(&parsed, allowed_locale),
            Err(_) => DEFAULT_CATEGORY.to_string(),
        };
        let category_id = self.get_or_create_category(&category_name)?;

        let id = match specs.get("Product Code") {
            Some(code) => (*code).to_string(),
            None => hash_id(url),
        };

        Ok(ProductRecord {
            id,
            url: url.to_string(),
            name: specs
                .get("Product Name")
                .map_or_else(|| "Unnamed Product".to_string(), |n| (*n).to_string()),
            category_id,
            description: specs
                .get("Description")
                .map_or_else(String::new, |d| (*d).to_string()),
            specs_json: serde_json::to_string(&specs).unwrap_or_else(|_| "{}".to_string()),
            images_json: serde_json::to_string(&images).unwrap_or_else(|_| "[]".to_string()),
            scraped_at: Utc::now().to_rfc3339(),
        })
    }
}

/// Stable fallback identity for products without an extracted code
fn hash_id(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..HASH_ID_LEN].to_string()
}
