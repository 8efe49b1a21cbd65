//! Literal-substring patching of the viewer document.
//!
//! The viewer document is patched by anchor search rather than markup
//! parsing: the stock viewer ships a stable charset declaration and a
//! stable bootstrap script tag, and inserting directly after them leaves
//! the rest of the document byte-identical. An absent anchor skips that
//! directive — the viewer still loads, just in its default state — instead
//! of failing the whole render.

/// Charset declaration the base directive is anchored to.
pub const CHARSET_ANCHOR: &str = r#"<meta charset="utf-8">"#;

/// Bootstrap script declaration the target directive is anchored to. The
/// directive must land after this tag so the option is registered before
/// the bootstrap script's own startup reads it.
pub const BOOTSTRAP_ANCHOR: &str = r#"<script src="viewer.js"></script>"#;

/// Result of a patch pass. `html` is always usable; the flags report which
/// directives were actually injected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub html: String,
    pub base_applied: bool,
    pub target_applied: bool,
}

/// Patch the viewer document for one element instance.
///
/// Injects a `<base>` tag pointing at `viewer_url`, so the viewer's
/// relative assets resolve against the viewer's own directory rather than
/// the host page, and a script that names `target_url` as the document the
/// viewer should open.
pub fn patch_viewer_document(
    viewer_html: &str,
    viewer_url: &str,
    target_url: &str,
) -> PatchOutcome {
    let mut html = viewer_html.to_string();

    let base_directive = format!(r#"<base href="{viewer_url}">"#);
    let base_applied = insert_after(&mut html, CHARSET_ANCHOR, &base_directive);

    let target_directive = format!(
        r#"<script>PDFViewerApplicationOptions.set("defaultUrl", "{target_url}");</script>"#
    );
    let target_applied = insert_after(&mut html, BOOTSTRAP_ANCHOR, &target_directive);

    PatchOutcome {
        html,
        base_applied,
        target_applied,
    }
}

/// Insert `insertion` immediately after the first occurrence of `anchor`.
/// Leaves `html` untouched and returns `false` when the anchor is absent.
fn insert_after(html: &mut String, anchor: &str, insertion: &str) -> bool {
    match html.find(anchor) {
        Some(position) => {
            html.insert_str(position + anchor.len(), insertion);
            true
        }
        None => false,
    }
}
