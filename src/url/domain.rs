use url::Url;

/// Extracts the lowercase host from a URL string
///
/// Returns `None` when the string does not parse as an absolute URL or has no
/// host (e.g. `mailto:` links).
///
/// # Examples
///
/// ```
/// use crawl_bot::url::extract_host;
///
/// assert_eq!(extract_host("https://EXAMPLE.com/path"), Some("example.com".to_string()));
/// assert_eq!(extract_host("https://example.com:8080/"), Some("example.com".to_string()));
/// assert_eq!(extract_host("mailto:someone@example.com"), None);
/// ```
pub fn extract_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|h| h.to_lowercase())
}

/// Returns true if the URL uses a scheme the crawler can fetch
pub fn is_http_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Returns the canonical form of a URL, without its fragment
///
/// This is the form links are extracted in, so a seed written as
/// `HTTP://Example.com` and a link to `http://example.com/` share one
/// frontier entry. Strings that do not parse are returned unchanged and left
/// for the transport to reject.
///
/// ```
/// use crawl_bot::url::canonicalize_url;
///
/// assert_eq!(canonicalize_url("HTTP://Example.com#top"), "http://example.com/");
/// assert_eq!(canonicalize_url("not a url"), "not a url");
/// ```
pub fn canonicalize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.into()
        }
        Err(_) => url.to_string(),
    }
}
