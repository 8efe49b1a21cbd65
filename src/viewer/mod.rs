//! Viewer document synthesis
//!
//! Turns the generic viewer document into an instance-specific one:
//! - [`cache`] supplies the raw viewer text, fetching at most once per
//!   viewer URL for the lifetime of the page
//! - [`patch`] injects the per-instance directives into that text

use thiserror::Error;
use url::Url;

pub mod cache;
pub mod patch;

/// Everything that can go wrong while preparing a viewer document for one
/// element instance.
///
/// `Clone` is required so the cache can hand the same failure to every
/// requester awaiting a shared fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewerError {
    /// The required `src` attribute is missing or empty.
    #[error("the `src` attribute is required on <pdf-embed>")]
    MissingSource,

    /// The `src` attribute (or the page base it resolves against) is not a
    /// usable URL.
    #[error("cannot resolve document URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The viewer document could not be retrieved.
    #[error("failed to fetch viewer document from {location}: {reason}")]
    Fetch { location: String, reason: String },

    /// The viewer document retrieval completed with a non-success response.
    #[error("viewer document fetch from {location} returned HTTP {status}")]
    Status { location: String, status: u16 },

    /// The patched document could not be turned into a loadable resource.
    #[error("failed to materialize viewer resource: {reason}")]
    Resource { reason: String },
}

impl ViewerError {
    /// Coarse classification used when reporting to the embedding page.
    pub fn kind(&self) -> &'static str {
        match self {
            ViewerError::MissingSource | ViewerError::InvalidUrl { .. } => "configuration",
            ViewerError::Fetch { .. } | ViewerError::Status { .. } => "fetch",
            ViewerError::Resource { .. } => "resource",
        }
    }
}

/// Resolve the element's `src` attribute against the host page location.
pub fn resolve_target(src: &str, base: &str) -> Result<Url, ViewerError> {
    let base = Url::parse(base).map_err(|err| ViewerError::InvalidUrl {
        url: base.to_string(),
        reason: err.to_string(),
    })?;
    base.join(src).map_err(|err| ViewerError::InvalidUrl {
        url: src.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_src_resolves_against_page() {
        let target = resolve_target("./a.pdf", "https://x/page.html").unwrap();
        assert_eq!(target.as_str(), "https://x/a.pdf");
    }

    #[test]
    fn nested_relative_src_resolves_against_page_directory() {
        let target = resolve_target("docs/report.pdf", "https://x/books/index.html").unwrap();
        assert_eq!(target.as_str(), "https://x/books/docs/report.pdf");
    }

    #[test]
    fn absolute_src_passes_through() {
        let target = resolve_target("https://files.example/a.pdf", "https://x/page.html").unwrap();
        assert_eq!(target.as_str(), "https://files.example/a.pdf");
    }

    #[test]
    fn unparsable_base_is_a_configuration_error() {
        let error = resolve_target("./a.pdf", "not a url").unwrap_err();
        assert_eq!(error.kind(), "configuration");
    }

    #[test]
    fn resolved_target_flows_into_patched_document() {
        let viewer_html = "<meta charset=\"utf-8\"><script src=\"viewer.js\"></script>";
        let target = resolve_target("./a.pdf", "https://x/page.html").unwrap();
        let outcome =
            patch::patch_viewer_document(viewer_html, "https://cdn/viewer.html", target.as_str());

        assert!(outcome
            .html
            .contains(r#"PDFViewerApplicationOptions.set("defaultUrl", "https://x/a.pdf")"#));
        assert!(outcome
            .html
            .contains(r#"<base href="https://cdn/viewer.html">"#));
    }

    #[test]
    fn error_kinds_match_taxonomy() {
        assert_eq!(ViewerError::MissingSource.kind(), "configuration");
        let fetch = ViewerError::Fetch {
            location: "https://cdn/viewer.html".to_string(),
            reason: "network unreachable".to_string(),
        };
        assert_eq!(fetch.kind(), "fetch");
        let status = ViewerError::Status {
            location: "https://cdn/viewer.html".to_string(),
            status: 503,
        };
        assert_eq!(status.kind(), "fetch");
    }
}
