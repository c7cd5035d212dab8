use crate::UrlError;
use url::Url;

/// Normalizes a URL into the identity used for de-duplication
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject schemes other than HTTP and HTTPS
/// 3. Lowercase the scheme and host
/// 4. Remove the fragment (everything after #)
///
/// Path, query and port are left untouched: two URLs differing only in
/// their query string are distinct documents.
///
/// # Examples
///
/// ```
/// use pdf_harvester::url::normalize_url;
///
/// let url = normalize_url("HTTPS://Example.ORG/Docs/A.pdf#page=2").unwrap();
/// assert_eq!(url.as_str(), "https://example.org/Docs/A.pdf");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Normalizes an already-parsed URL
pub fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .map(str::to_lowercase)
        .ok_or(UrlError::MissingDomain)?;
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    url.set_fragment(None);

    Ok(url)
}

/// Returns the de-duplication key for a URL
///
/// Falls back to the fragment-stripped string when the URL cannot be
/// normalized (e.g. a non-HTTP scheme), so callers always get a stable key.
pub fn dedup_key(url: &Url) -> String {
    match normalize_parsed(url.clone()) {
        Ok(normalized) => normalized.into(),
        Err(_) => {
            let mut fallback = url.clone();
            fallback.set_fragment(None);
            fallback.into()
        }
    }
}
