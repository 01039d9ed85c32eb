//! HTML extraction and page classification
//!
//! A page carrying the specification table markers is a leaf and yields
//! field rows; every other page is navigation and yields its anchor
//! links. All selectors are parsed once at construction.

use crate::crawler::{FieldRow, PageContent};
use crate::url::join_link;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Markup waited for before extracting from a navigation page
pub const DISCOVERY_WAIT_SELECTOR: &str = "a[href]";

/// Markup waited for before extracting from a product page
pub const PRODUCT_WAIT_SELECTOR: &str = "h1, table";

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// Classifies pages and extracts links or field rows from their markup
pub struct Extractor {
    base: Url,
    anchors: Selector,
    spec_tables: Selector,
    table_rows: Selector,
    row_header: Selector,
    row_value: Selector,
    product_name: Selector,
    product_code: Selector,
    description: Selector,
    product_images: Selector,
    image_links: Selector,
}

impl Extractor {
    /// Builds an extractor resolving relative links against `base`
    pub fn new(base: Url) -> Self {
        // All patterns are static; a parse failure here is a programming
        // error, caught by the constructor test below.
        let sel = |s: &str| Selector::parse(s).unwrap_or_else(|e| panic!("bad selector {s}: {e}"));

        Self {
            base,
            anchors: sel("a[href]"),
            spec_tables: sel("div.product-info-specs table.table, table.table-striped"),
            table_rows: sel("tr"),
            row_header: sel("th"),
            row_value: sel("td"),
            product_name: sel("h1.product-card-title"),
            product_code: sel("small.product-card-info"),
            description: sel("div.xtt-product-description p"),
            product_images: sel(
                "div.product-image img[src], img.product-image[src], \
                 div.xtt-product-image-zoom img[src], div.product-gallery img[src], \
                 ul.product-thumbnails img[src], div.carousel-item img[src], \
                 div.product-images img[src], section.product-images img[src], \
                 img[src*='product'], img[src*='Product']",
            ),
            image_links: sel(
                "a[href*='.jpg'], a[href*='.jpeg'], a[href*='.png'], \
                 a[href*='.gif'], a[href*='.webp']",
            ),
        }
    }

    /// Classifies a page and extracts its content
    ///
    /// Leaf markers win: a page with product-header or
    /// specification-table rows yields those rows and no follow links,
    /// anything else yields its links and no rows.
    pub fn classify(&self, url: &Url, html: &str) -> PageContent {
        let document = Html::parse_document(html);

        let mut rows = self.product_header_rows(url, &document);
        rows.extend(self.spec_table_rows(url, &document));
        if !rows.is_empty() {
            rows.extend(self.image_rows(url, &document));
            return PageContent::Leaf { rows };
        }

        PageContent::Navigation {
            urls: self.extract_links(url, &document),
        }
    }

    /// All resolvable anchor targets on the page, deduplicated in document
    /// order
    fn extract_links(&self, page_url: &Url, document: &Html) -> Vec<Url> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for anchor in document.select(&self.anchors) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(url) = join_link(page_url, href) else {
                continue;
            };
            if seen.insert(url.clone()) {
                links.push(url);
            }
        }
        links
    }

    /// `th`/`td` pairs from the specification tables
    fn spec_table_rows(&self, url: &Url, document: &Html) -> Vec<FieldRow> {
        let mut rows = Vec::new();
        for table in document.select(&self.spec_tables) {
            for tr in table.select(&self.table_rows) {
                let header = tr.select(&self.row_header).next().map(element_text);
                let value = tr.select(&self.row_value).next().map(element_text);
                if let (Some(feature), Some(value)) = (header, value) {
                    push_row(&mut rows, url, feature, value);
                }
            }
        }
        rows
    }

    /// Name, code, and description rows from the product header block
    fn product_header_rows(&self, url: &Url, document: &Html) -> Vec<FieldRow> {
        let mut rows = Vec::new();

        if let Some(name) = document.select(&self.product_name).next() {
            push_row(&mut rows, url, "Product Name".to_string(), element_text(name));
        }

        if let Some(code) = document.select(&self.product_code).next() {
            let value = element_text(code)
                .replace("Product:", "")
                .trim()
                .to_string();
            push_row(&mut rows, url, "Product Code".to_string(), value);
        }

        if let Some(desc) = document.select(&self.description).next() {
            push_row(&mut rows, url, "Description".to_string(), element_text(desc));
        }

        rows
    }

    /// Numbered `Image URL N` rows from gallery `img` tags and direct
    /// image anchors
    fn image_rows(&self, url: &Url, document: &Html) -> Vec<FieldRow> {
        let mut seen = HashSet::new();
        let mut images = Vec::new();

        for img in document.select(&self.product_images) {
            if let Some(src) = img.value().attr("src") {
                self.collect_image(url, src, true, &mut seen, &mut images);
            }
        }
        for anchor in document.select(&self.image_links) {
            if let Some(href) = anchor.value().attr("href") {
                self.collect_image(url, href, false, &mut seen, &mut images);
            }
        }

        let mut rows = Vec::new();
        for (i, image) in images.into_iter().enumerate() {
            push_row(&mut rows, url, format!("Image URL {}", i + 1), image);
        }
        rows
    }

    fn collect_image(
        &self,
        page_url: &Url,
        raw: &str,
        require_extension: bool,
        seen: &mut HashSet<String>,
        out: &mut Vec<String>,
    ) {
        let raw = raw.trim();
        if raw.is_empty() {
            return;
        }

        // Root-relative sources resolve against the site base; everything
        // else against the page itself.
        let resolved = if raw.starts_with('/') {
            self.base.join(raw)
        } else {
            page_url.join(raw)
        };
        let Ok(url) = resolved else { return };

        let text = url.to_string();
        let lower = text.to_lowercase();
        if require_extension && !IMAGE_EXTENSIONS.iter().any(|ext| lower.contains(ext)) {
            return;
        }
        if seen.insert(text.clone()) {
            out.push(text);
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn push_row(rows: &mut Vec<FieldRow>, url: &Url, feature: String, value: String) {
    if feature.is_empty() || value.is_empty() {
        return;
    }
    rows.push(FieldRow {
        source_url: url.to_string(),
        feature,
        value,
    });
}
