use url::Url;

/// Path extensions that identify asset links rather than pages
const ASSET_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".pdf"];

/// Path tokens that mark a URL as product-like
///
/// This is a pure policy predicate: it only partitions the discovered set
/// for the extraction phase and has no effect on pool or scheduler logic.
const PRODUCT_PATH_TOKENS: &[&str] = &[
    "/product/",
    "/products/",
    "/produtos/",
    "/catalog/",
    "/industrial/",
    "/motors/",
    "/drives/",
    "/automation/",
    "/p/",
];

/// Decides whether a discovered link may enter the frontier
///
/// A candidate must share the base URL's host, contain the allowed locale
/// segment in its path, and not point at a static asset.
pub fn is_candidate(url: &Url, base: &Url, allowed_locale: &str) -> bool {
    if url.host_str() != base.host_str() {
        return false;
    }

    if !url.path().contains(allowed_locale) {
        return false;
    }

    !is_asset(url)
}

/// Returns true if the URL points at a static asset (image, document)
pub fn is_asset(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Heuristic: does this URL look like a product page?
pub fn is_product_like(url: &Url) -> bool {
    let lower = url.as_str().to_lowercase();
    PRODUCT_PATH_TOKENS.iter().any(|token| lower.contains(token))
}
