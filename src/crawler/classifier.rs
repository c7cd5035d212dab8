//! PDF classification
//!
//! Decides whether a URL (or a fetched response) is a PDF document. Rules
//! apply in order and the first one that matches wins:
//!
//! 1. Response content-type (`application/pdf`)
//! 2. URL path suffix (`.pdf`, query ignored)
//! 3. Document-directory path with a `.pdf` ending
//!
//! A response whose content-type is present and is neither PDF nor a generic
//! binary type is decided by rule 1 alone.

use url::Url;

/// What made the classifier decide a subject is a PDF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evidence {
    ContentType,
    Suffix,
    DocumentDirectory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    IsPdf(Evidence),
    NotPdf,
}

/// The thing being classified
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    /// A fetched response: its final URL and content-type header
    Response {
        url: &'a Url,
        content_type: Option<&'a str>,
    },
    /// A link found on a page, before any request is made
    Link(&'a Url),
}

/// Coarse media type of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Pdf,
    Html,
    /// Absent, empty, or a generic binary type
    Generic,
    Other,
}

impl ContentKind {
    pub fn of(content_type: Option<&str>) -> Self {
        let Some(raw) = content_type else {
            return Self::Generic;
        };

        let mime = raw
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "" | "application/octet-stream" | "binary/octet-stream" => Self::Generic,
            "text/html" | "application/xhtml+xml" => Self::Html,
            m if m.contains("application/pdf") => Self::Pdf,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PdfClassifier {
    document_dirs: Vec<String>,
}

impl PdfClassifier {
    pub fn new<S: AsRef<str>>(document_dirs: &[S]) -> Self {
        Self {
            document_dirs: document_dirs
                .iter()
                .map(|d| d.as_ref().to_string())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    pub fn classify(&self, subject: Subject<'_>) -> Classification {
        let url = match subject {
            Subject::Response { url, content_type } => match ContentKind::of(content_type) {
                ContentKind::Pdf => return Classification::IsPdf(Evidence::ContentType),
                ContentKind::Generic => url,
                ContentKind::Html | ContentKind::Other => return Classification::NotPdf,
            },
            Subject::Link(url) => url,
        };

        self.classify_url(url)
    }

    fn classify_url(&self, url: &Url) -> Classification {
        if ends_with_pdf(url.path()) {
            return Classification::IsPdf(Evidence::Suffix);
        }

        if self.in_document_dir(url) && ends_with_pdf(without_fragment(url)) {
            return Classification::IsPdf(Evidence::DocumentDirectory);
        }

        Classification::NotPdf
    }

    fn in_document_dir(&self, url: &Url) -> bool {
        let path = url.path();
        self.document_dirs.iter().any(|dir| path.contains(dir.as_str()))
    }
}

fn ends_with_pdf(s: &str) -> bool {
    s.len() >= 4
        && s.is_char_boundary(s.len() - 4)
        && s[s.len() - 4..].eq_ignore_ascii_case(".pdf")
}

fn without_fragment(url: &Url) -> &str {
    let s = url.as_str();
    s.split_once('#').map(|(head, _)| head).unwrap_or(s)
}
