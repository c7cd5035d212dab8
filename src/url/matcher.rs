/// Checks if a host falls inside an allowed domain
///
/// A host matches when it equals the domain or is a subdomain of it
/// (ends with `.` + domain). A leading `*.` on the domain is accepted and
/// means the same thing. Matching is on label boundaries, so
/// `eviltgn.com.ar` does not match `tgn.com.ar`.
///
/// # Examples
///
/// ```
/// use pdf_harvester::url::matches_domain;
///
/// assert!(matches_domain("example.org", "example.org"));
/// assert!(matches_domain("example.org", "www.example.org"));
/// assert!(matches_domain("*.example.org", "cdn.example.org"));
/// assert!(!matches_domain("example.org", "notexample.org"));
/// ```
pub fn matches_domain(domain: &str, host: &str) -> bool {
    let domain = domain.strip_prefix("*.").unwrap_or(domain);
    let domain = domain.trim_end_matches('.');
    let host = host.trim_end_matches('.');

    if host.len() < domain.len() {
        return false;
    }

    if host.eq_ignore_ascii_case(domain) {
        return true;
    }

    let split = host.len() - domain.len();
    host.is_char_boundary(split)
        && host[split..].eq_ignore_ascii_case(domain)
        && host[..split].ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_domain("example.org", "example.org"));
        assert!(matches_domain("tgn.com.ar", "tgn.com.ar"));
    }

    #[test]
    fn test_subdomain_match() {
        assert!(matches_domain("tgn.com.ar", "www.tgn.com.ar"));
        assert!(matches_domain("example.org", "a.b.example.org"));
    }

    #[test]
    fn test_wildcard_prefix_tolerated() {
        assert!(matches_domain("*.example.org", "example.org"));
        assert!(matches_domain("*.example.org", "blog.example.org"));
    }

    #[test]
    fn test_label_boundary() {
        assert!(!matches_domain("tgn.com.ar", "eviltgn.com.ar"));
        assert!(!matches_domain("example.org", "example.org.evil.com"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches_domain("Example.ORG", "www.example.org"));
    }

    #[test]
    fn test_other_domain() {
        assert!(!matches_domain("example.org", "other-domain.com"));
        assert!(!matches_domain("www.example.org", "example.org"));
    }
}
