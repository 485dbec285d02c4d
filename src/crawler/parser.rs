//! Raw-text link extraction and body decoding
//!
//! Pages are never parsed into a DOM. Links are discovered by pattern
//! matching anchor openings in the raw body, which is fast and tolerant of
//! broken markup at the cost of occasionally missing exotic constructs.
//!
//! This module handles:
//! - Stripping HTML comments so commented-out links are not followed
//! - Resolving the effective base URL from a `<base href>` declaration
//! - Extracting and resolving `<a href>` targets
//! - Deciding whether a response is text worth scanning
//! - Decoding body bytes into text

use crate::url::is_http_url;
use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

/// Stand-in body for responses that are not text
pub const BINARY_PLACEHOLDER: &str = "<<...binary content omitted by crawl-bot...>>";

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("hardcoded regex pattern is valid"));

static BASE_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<base\s(?:[^>]*?\s)?href\s*=\s*["']([^"']*)["']"#)
        .expect("hardcoded regex pattern is valid")
});

// The captured value stops at the first `#` so fragments never reach the
// frontier.
static ANCHOR_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a\s(?:[^>]*?\s)?href\s*=\s*["']([^"'#]*)[#"']"#)
        .expect("hardcoded regex pattern is valid")
});

static ABSOLUTE_ANCHOR_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a\s(?:[^>]*?\s)?href\s*=\s*["']([a-z][a-z0-9+.\-]*://[^"'#]*)[#"']"#)
        .expect("hardcoded regex pattern is valid")
});

/// Options controlling which links are extracted
#[derive(Clone, Copy)]
pub struct LinkOptions<'a> {
    /// Only extract absolute links that carry a scheme
    pub ignore_relative_links: bool,

    /// Links failing this check are dropped
    pub should_crawl_url: &'a (dyn Fn(&str) -> bool + Send + Sync),
}

/// Extracts the crawlable links of a page
///
/// # Extraction Rules
///
/// 1. HTML comments are removed first
/// 2. The base URL is the `<base href>` target resolved against `page_url`,
///    or `page_url` itself
/// 3. Every `<a ... href="...">` value up to the first `#` is resolved against
///    the base (absolute-scheme hrefs only when `ignore_relative_links`)
/// 4. Duplicates are removed, keeping first occurrence order
/// 5. Non-`http(s)` links (`mailto:`, `javascript:`, `ftp:`, ...) and links
///    failing `should_crawl_url` are dropped
///
/// # Example
///
/// ```
/// use crawl_bot::crawler::{extract_links, LinkOptions};
///
/// let body = r#"<a href="/about#team">About</a> <!-- <a href="/old">Old</a> -->"#;
/// let allow_all = |_: &str| true;
/// let options = LinkOptions { ignore_relative_links: false, should_crawl_url: &allow_all };
/// let links = extract_links("https://example.com/index.html", body, options);
/// assert_eq!(links, vec!["https://example.com/about".to_string()]);
/// ```
pub fn extract_links(page_url: &str, body: &str, options: LinkOptions<'_>) -> Vec<String> {
    let page = match Url::parse(page_url) {
        Ok(page) => page,
        Err(e) => {
            tracing::debug!("Cannot extract links from unparseable URL {}: {}", page_url, e);
            return Vec::new();
        }
    };

    let body = strip_comments(body);
    let base = resolve_base_url(&page, &body);

    let pattern: &Regex = if options.ignore_relative_links {
        &ABSOLUTE_ANCHOR_HREF
    } else {
        &ANCHOR_HREF
    };

    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    for captures in pattern.captures_iter(&body) {
        let href = captures[1].trim();
        let link = match base.join(href) {
            Ok(link) => link,
            Err(_) => continue,
        };
        if seen.insert(link.to_string()) {
            resolved.push(link);
        }
    }

    resolved
        .into_iter()
        .filter(is_http_url)
        .map(String::from)
        .filter(|link| (options.should_crawl_url)(link))
        .collect()
}

/// Removes every `<!-- ... -->` comment, including multi-line ones
pub fn strip_comments(body: &str) -> Cow<'_, str> {
    COMMENT.replace_all(body, "")
}

/// Resolves the base URL links on a page are relative to
///
/// Follows the HTML `<base>` rule: the first `<base href>` is resolved
/// against the document URL; without one the document URL is the base.
pub fn resolve_base_url(page: &Url, body: &str) -> Url {
    BASE_HREF
        .captures(body)
        .and_then(|captures| page.join(captures[1].trim()).ok())
        .unwrap_or_else(|| page.clone())
}

/// Returns true if the content type declares an HTML document
pub fn is_text_content(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("text/html"))
        .unwrap_or(false)
}

/// Decodes a response body into text
///
/// The charset is taken from the `Content-Encoding` value when it names one
/// (some servers put the charset there), then from the `charset=` parameter
/// of `Content-Type`. Anything else, or a body that does not decode cleanly,
/// falls back to lossy UTF-8.
pub fn decode_body(
    body: &[u8],
    content_encoding: Option<&str>,
    content_type: Option<&str>,
) -> String {
    let encoding = content_encoding
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .or_else(|| {
            content_type
                .and_then(charset_param)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or(UTF_8);

    let (text, actual, had_errors) = encoding.decode(body);
    if had_errors && actual != UTF_8 {
        tracing::debug!("Body is not valid {}, falling back to UTF-8", encoding.name());
        return String::from_utf8_lossy(body).into_owned();
    }
    text.into_owned()
}

/// Extracts the `charset` parameter of a Content-Type value
fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"'))
        } else {
            None
        }
    })
}
