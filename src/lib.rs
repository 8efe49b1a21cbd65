//! `<pdf-embed>` custom element
//!
//! A WASM-based custom element that displays a PDF file by embedding an
//! isolated pdf.js viewer:
//! - fetch-once caching of the shared viewer document
//! - per-instance patching (asset base path + target file directive)
//! - blob-backed loading inside a closed shadow root
//!
//! This crate is designed to work entirely in the browser without a server.
//!
//! ```html
//! <script type="module" src="./pkg/pdf_embed.js"></script>
//! <pdf-embed src="./path/to/file.pdf"></pdf-embed>
//! ```

use wasm_bindgen::prelude::*;

pub mod config;
pub mod viewer;

#[cfg(target_arch = "wasm32")]
pub mod element;

// Re-export common types
pub use viewer::cache::ViewerCache;
pub use viewer::patch::{patch_viewer_document, PatchOutcome};
pub use viewer::{resolve_target, ViewerError};

/// Initialize the WASM module
/// Runs automatically when the module is instantiated: installs the panic
/// hook and registers the `<pdf-embed>` element.
#[wasm_bindgen(start)]
pub fn init() -> Result<(), JsValue> {
    // Set up better panic messages in debug mode
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(target_arch = "wasm32")]
    element::register()?;

    Ok(())
}

/// Viewer document URL shared by all `<pdf-embed>` instances.
#[wasm_bindgen(js_name = "viewerUrl")]
pub fn viewer_url() -> String {
    config::viewer_url()
}

/// Point future `<pdf-embed>` instances at a different viewer document.
///
/// Instances that already rendered keep the viewer text cached under the
/// previous URL; only new renders pick up the change.
#[wasm_bindgen(js_name = "setViewerUrl")]
pub fn set_viewer_url(url: &str) {
    config::set_viewer_url(url);
}
