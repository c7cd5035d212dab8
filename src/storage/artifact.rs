use std::path::PathBuf;
use url::Url;

/// File name used when a URL path names a directory (or nothing at all)
pub const DEFAULT_ARTIFACT_NAME: &str = "document.pdf";

/// A PDF to be stored, and where it goes relative to the store root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfArtifact {
    pub source_url: Url,
    pub target_path: PathBuf,
}

impl PdfArtifact {
    pub fn from_url(url: &Url) -> Self {
        Self {
            source_url: url.clone(),
            target_path: artifact_path(url),
        }
    }
}

/// Derives the store-relative path for a URL
///
/// The URL path is mirrored with its leading slash stripped. Empty, `.`
/// and `..` segments are dropped so the result can never leave the store
/// root. Segments stay percent-encoded. A path ending in `/`, or an empty
/// path, gets [`DEFAULT_ARTIFACT_NAME`].
///
/// # Examples
///
/// ```
/// use pdf_harvester::storage::artifact_path;
/// use std::path::PathBuf;
/// use url::Url;
///
/// let url = Url::parse("https://www.tgn.com.ar/assets/media/2025/03/file.pdf").unwrap();
/// assert_eq!(artifact_path(&url), PathBuf::from("assets/media/2025/03/file.pdf"));
/// ```
pub fn artifact_path(url: &Url) -> PathBuf {
    let raw = url.path();
    let mut segments: Vec<&str> = raw
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect();

    if segments.is_empty() || raw.ends_with('/') {
        segments.push(DEFAULT_ARTIFACT_NAME);
    }

    segments.iter().collect()
}
