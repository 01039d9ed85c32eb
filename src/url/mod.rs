//! URL normalization and candidate classification
//!
//! Normalization produces the canonical identity used for frontier
//! membership; classification decides which discovered links may be
//! crawled and which URLs look like product pages.

mod classify;
mod normalize;

pub use classify::{is_asset, is_candidate, is_product_like};
pub use normalize::normalize_url;

use url::Url;

/// Resolves an href found in a page against its base URL
///
/// Returns `None` for empty hrefs, bare fragments, and anything that does
/// not normalize cleanly.
pub fn join_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let joined = base.join(href).ok()?;
    normalize_url(joined.as_str()).ok()
}
