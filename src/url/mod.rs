//! URL handling module
//!
//! This module provides URL normalization (the de-duplication identity)
//! and allowed-domain matching.

mod matcher;
mod normalize;

use url::Url;

// Re-export main functions
pub use matcher::matches_domain;
pub use normalize::{dedup_key, normalize_parsed, normalize_url};

/// The set of domains a crawl may visit
///
/// A host is allowed when any entry suffix-matches it on a label boundary
/// (see [`matches_domain`]).
#[derive(Debug, Clone, Default)]
pub struct AllowedDomains {
    domains: Vec<String>,
}

impl AllowedDomains {
    /// Builds the allow-list from configured domain entries
    pub fn new<S: AsRef<str>>(domains: &[S]) -> Self {
        Self {
            domains: domains
                .iter()
                .map(|d| d.as_ref().trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// Returns true if the host is inside the allow-list
    pub fn contains_host(&self, host: &str) -> bool {
        self.domains.iter().any(|d| matches_domain(d, host))
    }

    /// Returns true if the URL's host is inside the allow-list
    pub fn contains_url(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| self.contains_host(host))
            .unwrap_or(false)
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> AllowedDomains {
        AllowedDomains::new(&["tgn.com.ar", "www.tgn.com.ar"])
    }

    #[test]
    fn test_contains_host() {
        let allowed = allowed();
        assert!(allowed.contains_host("tgn.com.ar"));
        assert!(allowed.contains_host("www.tgn.com.ar"));
        assert!(allowed.contains_host("static.tgn.com.ar"));
        assert!(!allowed.contains_host("other.org"));
    }

    #[test]
    fn test_contains_url() {
        let allowed = allowed();
        let inside = Url::parse("https://www.tgn.com.ar/assets/media/a.pdf").unwrap();
        let outside = Url::parse("https://other.org/c.pdf").unwrap();
        assert!(allowed.contains_url(&inside));
        assert!(!allowed.contains_url(&outside));
    }

    #[test]
    fn test_entries_are_trimmed_and_lowercased() {
        let allowed = AllowedDomains::new(&["  Example.ORG ", ""]);
        assert_eq!(allowed.domains(), &["example.org".to_string()]);
        assert!(allowed.contains_host("www.example.org"));
    }

    #[test]
    fn test_empty_allows_nothing() {
        let allowed = AllowedDomains::default();
        assert!(allowed.is_empty());
        assert!(!allowed.contains_host("example.org"));
    }
}
