use crate::UrlError;
use url::Url;

/// Normalizes a URL into its frontier identity form
///
/// The canonical form keeps scheme, host, and path only:
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject non-HTTP(S) schemes
/// 3. Lowercase the host
/// 4. Remove the fragment (everything after #)
/// 5. Remove the query string
///
/// The result is idempotent: normalizing an already-normalized URL
/// returns it unchanged. The string form of the returned URL is the sole
/// identity used for frontier membership.
///
/// # Examples
///
/// ```
/// use indumine_crawler::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM/catalog/p/123?tab=specs#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/catalog/p/123");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    url.set_query(None);

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_strips_query() {
        let result = normalize_url("https://example.com/page?a=1&b=2").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_strips_both() {
        let result = normalize_url("https://example.com/page?tab=specs#top").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_lowercases_host() {
        let result = normalize_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "https://example.com/catalog/p/123?x=1#frag",
            "http://EXAMPLE.com/a/b/",
            "https://example.com/",
        ];

        for input in inputs {
            let once = normalize_url(input).unwrap();
            let twice = normalize_url(once.as_str()).unwrap();
            assert_eq!(once, twice, "normalize not idempotent for {}", input);
        }
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        let result = normalize_url("not a url");
        assert!(result.is_err());
    }
}
