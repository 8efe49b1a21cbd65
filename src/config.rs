//! Process-wide viewer configuration.
//!
//! The viewer URL identifies the generic viewer document that every
//! `<pdf-embed>` instance embeds. The embedding application may replace it
//! at any time; instances that already rendered keep their viewer text
//! cached under the previous URL, so the change only affects later renders.

use std::cell::RefCell;

/// Hosted pdf.js viewer used when the embedding application does not point
/// the element at its own copy.
pub const DEFAULT_VIEWER_URL: &str = "https://mozilla.github.io/pdf.js/web/viewer.html";

thread_local! {
    static VIEWER_URL: RefCell<String> = RefCell::new(DEFAULT_VIEWER_URL.to_string());
}

/// The viewer document URL the next render will use.
pub fn viewer_url() -> String {
    VIEWER_URL.with(|url| url.borrow().clone())
}

/// Replace the viewer document URL for all future renders.
pub fn set_viewer_url(url: &str) {
    VIEWER_URL.with(|current| *current.borrow_mut() = url.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_hosted_viewer() {
        assert_eq!(viewer_url(), DEFAULT_VIEWER_URL);
    }

    #[test]
    fn replacement_applies_to_later_reads() {
        set_viewer_url("https://cdn.example/pdfjs/web/viewer.html");
        assert_eq!(viewer_url(), "https://cdn.example/pdfjs/web/viewer.html");
        set_viewer_url(DEFAULT_VIEWER_URL);
    }
}
