//! Sink-to-database loading
//!
//! Reads the extracted-rows sink, regroups the flat rows into one record
//! per product, resolves each product's category relationally, and
//! upserts the records so reloading the same sink is idempotent.

mod schema;
mod sqlite;

pub use sqlite::CatalogStore;

use thiserror::Error;
use url::Url;

/// Errors that can occur while loading sink data into the database
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Sink error: {0}")]
    Sink(#[from] crate::sink::SinkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;

/// One product ready to be upserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    /// Stable product identity: the product code when extracted, a hash
    /// of the URL otherwise
    pub id: String,
    pub url: String,
    pub name: String,
    pub category_id: i64,
    pub description: String,
    /// Feature/value pairs as a JSON object
    pub specs_json: String,
    /// Image URLs as a JSON array
    pub images_json: String,
    pub scraped_at: String,
}

/// Fallback category for URLs whose path carries no usable segment
pub const DEFAULT_CATEGORY: &str = "General";

/// Derives a category name from a product URL's path
///
/// Uses the path segment following the locale's language segment,
/// title-cased with hyphens turned into spaces.
pub fn category_from_url(url: &Url, allowed_locale: &str) -> String {
    let Some(segments) = url.path_segments() else {
        return DEFAULT_CATEGORY.to_string();
    };
    let segments: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();

    // The locale is a path fragment like "/BR/en/"; its last segment is
    // the language marker the category segment follows.
    let language = allowed_locale
        .split('/')
        .filter(|s| !s.is_empty())
        .next_back();

    let raw = match language.and_then(|lang| segments.iter().position(|s| *s == lang)) {
        Some(idx) => segments.get(idx + 1),
        None if segments.len() >= 2 => segments.get(segments.len() - 2),
        None => None,
    };

    match raw {
        Some(segment) => title_case(&segment.replace('-', " ")),
        None => DEFAULT_CATEGORY.to_string(),
    }
}

/// Lowercase, alphanumeric-and-hyphen slug for category lookups
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_was_separator = true;
    for c in text.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_was_separator = false;
        } else if (c.is_whitespace() || c == '-') && !last_was_separator {
            slug.push('-');
            last_was_separator = true;
        }
    }
    if slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_category_follows_language_segment() {
        let u = url("https://www.example-catalog.net/catalog/BR/en/electric-motors/w22/p/1");
        assert_eq!(category_from_url(&u, "/BR/en/"), "Electric Motors");
    }

    #[test]
    fn test_category_without_language_uses_parent_segment() {
        let u = url("https://www.example-catalog.net/catalog/drives/p-123");
        assert_eq!(category_from_url(&u, "/BR/en/"), "Drives");
    }

    #[test]
    fn test_category_defaults_when_path_is_bare() {
        let u = url("https://www.example-catalog.net/");
        assert_eq!(category_from_url(&u, "/BR/en/"), "General");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Electric Motors"), "electric-motors");
        assert_eq!(slugify("  Pumps & Valves  "), "pumps-valves");
        assert_eq!(slugify("low--voltage"), "low-voltage");
    }
}
