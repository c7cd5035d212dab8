//! HTML link extraction
//!
//! This module turns an HTML page into the list of internal links worth
//! following. Classification of those links happens elsewhere.

use crate::url::{dedup_key, AllowedDomains};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracts followable links from an HTML page
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` and `<area href="...">`, in document order
/// - `download` links (these are often the PDFs we want)
/// - `rel="nofollow"` links
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
/// - Non-HTTP(S) URLs after resolution
/// - Hosts outside the allowed domains
///
/// Relative links are resolved against `<base href>` when the page declares
/// one, otherwise against `base_url`. Links are de-duplicated by their
/// normalized form; the first occurrence wins.
///
/// # Example
///
/// ```
/// use pdf_harvester::crawler::extract_links;
/// use pdf_harvester::AllowedDomains;
/// use url::Url;
///
/// let html = r#"<a href="/report.pdf">Report</a><a href="https://other.org/">Other</a>"#;
/// let base = Url::parse("https://example.org/").unwrap();
/// let allowed = AllowedDomains::new(&["example.org"]);
/// let links = extract_links(html, &base, &allowed);
/// assert_eq!(links.len(), 1);
/// assert_eq!(links[0].as_str(), "https://example.org/report.pdf");
/// ```
pub fn extract_links(html: &str, base_url: &Url, allowed: &AllowedDomains) -> Vec<Url> {
    let document = Html::parse_document(html);
    let base = document_base(&document, base_url);

    let Ok(selector) = Selector::parse("a[href], area[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Some(url) = resolve_link(href, &base) else {
            continue;
        };

        if !allowed.contains_url(&url) {
            continue;
        }

        if seen.insert(dedup_key(&url)) {
            links.push(url);
        }
    }

    links
}

/// Returns the effective base URL, honoring `<base href>`
fn document_base(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|element| element.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .unwrap_or_else(|| page_url.clone())
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url),
        _ => None,
    }
}
