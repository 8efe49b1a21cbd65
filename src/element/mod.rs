//! The `<pdf-embed>` element: lifecycle glue around the viewer pipeline.
//!
//! The custom element class itself lives in `shim.js`; it owns the closed
//! shadow root and forwards lifecycle callbacks here. Everything else —
//! attribute validation, viewer fetch, patching, blob materialization —
//! happens on the Rust side.

use js_sys::{Array, Object, Reflect};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Blob, BlobPropertyBag, CustomEvent, CustomEventInit, HtmlElement, HtmlIFrameElement,
    ShadowRoot, Url,
};

use crate::config;
use crate::viewer::cache::ViewerCache;
use crate::viewer::patch::{self, PatchOutcome};
use crate::viewer::{resolve_target, ViewerError};

/// Tag the element is registered under.
pub const TAG_NAME: &str = "pdf-embed";

/// Event dispatched on the host element when a render fails.
pub const ERROR_EVENT: &str = "pdf-embed-error";

/// Expando property carrying the render generation. Bumped on every attach
/// and detach so a render finishing late can tell its output is stale.
const GENERATION_PROP: &str = "__pdfEmbedGeneration";

const HOST_STYLE: &str = ":host {
  display: block;
  width: 300px;
  height: 150px;
}
iframe {
  width: 100%;
  height: 100%;
  border: none;
}";

#[wasm_bindgen(module = "/src/element/shim.js")]
extern "C" {
    #[wasm_bindgen(js_name = defineViewerElement)]
    fn define_viewer_element(tag: &str, hooks: &Object);
}

thread_local! {
    static REGISTERED: std::cell::Cell<bool> = std::cell::Cell::new(false);
}

/// Register `<pdf-embed>` with the page's custom element registry.
///
/// Safe to call more than once; later calls are no-ops.
pub fn register() -> Result<(), JsValue> {
    if REGISTERED.with(|registered| registered.replace(true)) {
        return Ok(());
    }

    let hooks = Object::new();

    let connected = Closure::<dyn Fn(HtmlElement, ShadowRoot)>::new(on_connected);
    Reflect::set(&hooks, &JsValue::from_str("connected"), connected.as_ref())?;
    connected.forget();

    let disconnected =
        Closure::<dyn Fn(HtmlElement, ShadowRoot)>::new(|host: HtmlElement, shadow: ShadowRoot| {
            on_disconnected(&host, &shadow);
        });
    Reflect::set(
        &hooks,
        &JsValue::from_str("disconnected"),
        disconnected.as_ref(),
    )?;
    disconnected.forget();

    define_viewer_element(TAG_NAME, &hooks);
    Ok(())
}

fn on_connected(host: HtmlElement, shadow: ShadowRoot) {
    attach_style(&shadow);
    let generation = bump_generation(&host);
    wasm_bindgen_futures::spawn_local(async move {
        if let Err(error) = render_into(&host, &shadow, generation).await {
            report_error(&host, &error);
        }
    });
}

fn on_disconnected(host: &HtmlElement, shadow: &ShadowRoot) {
    // A render still in flight sees the bumped generation and discards its
    // output instead of appending into the cleared subtree.
    bump_generation(host);
    shadow.set_inner_html("");
}

/// Full render path for one attachment: attribute → target URL → cached
/// viewer text → patched document → blob object URL → iframe.
async fn render_into(
    host: &HtmlElement,
    shadow: &ShadowRoot,
    generation: f64,
) -> Result<(), ViewerError> {
    let src = host
        .get_attribute("src")
        .filter(|value| !value.is_empty())
        .ok_or(ViewerError::MissingSource)?;
    let base = page_href().ok_or_else(|| ViewerError::InvalidUrl {
        url: src.clone(),
        reason: "host page location is unavailable".to_string(),
    })?;
    let target = resolve_target(&src, &base)?;

    let viewer_url = config::viewer_url();
    let viewer_html = ViewerCache::shared().viewer_text(&viewer_url).await?;

    let PatchOutcome {
        html,
        base_applied,
        target_applied,
    } = patch::patch_viewer_document(&viewer_html, &viewer_url, target.as_str());
    if !base_applied {
        console_warn(&format!(
            "viewer document at {viewer_url} has no charset declaration; relative assets may \
             resolve against the host page"
        ));
    }
    if !target_applied {
        console_warn(&format!(
            "viewer document at {viewer_url} has no bootstrap script tag; the viewer will open \
             without a document"
        ));
    }

    let object_url = materialize(&html)?;

    if !host.is_connected() || current_generation(host) != generation {
        // Detached (or re-attached) while the fetch was in flight; the new
        // attachment runs its own render.
        let _ = Url::revoke_object_url(&object_url);
        return Ok(());
    }

    let Some(iframe) = create_frame(&object_url) else {
        let _ = Url::revoke_object_url(&object_url);
        return Err(ViewerError::Resource {
            reason: "could not create viewer frame".to_string(),
        });
    };
    let _ = shadow.append_child(iframe.as_ref());
    Ok(())
}

/// Build a blob-backed object URL for the patched viewer document.
fn materialize(html: &str) -> Result<String, ViewerError> {
    let options = BlobPropertyBag::new();
    options.set_type("text/html");
    let parts = Array::of1(&JsValue::from_str(html));
    let blob =
        Blob::new_with_str_sequence_and_options(parts.as_ref(), &options).map_err(|_| {
            ViewerError::Resource {
                reason: "could not construct viewer blob".to_string(),
            }
        })?;
    Url::create_object_url_with_blob(&blob).map_err(|_| ViewerError::Resource {
        reason: "could not create object URL".to_string(),
    })
}

fn create_frame(object_url: &str) -> Option<HtmlIFrameElement> {
    let document = web_sys::window()?.document()?;
    let iframe = document
        .create_element("iframe")
        .ok()?
        .dyn_into::<HtmlIFrameElement>()
        .ok()?;
    iframe.set_src(object_url);
    Some(iframe)
}

fn attach_style(shadow: &ShadowRoot) {
    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        return;
    };
    if let Ok(style) = document.create_element("style") {
        style.set_text_content(Some(HOST_STYLE));
        let _ = shadow.append_child(&style);
    }
}

fn page_href() -> Option<String> {
    web_sys::window()?.location().href().ok()
}

fn bump_generation(host: &HtmlElement) -> f64 {
    let next = current_generation(host) + 1.0;
    let _ = Reflect::set(
        host.as_ref(),
        &JsValue::from_str(GENERATION_PROP),
        &JsValue::from_f64(next),
    );
    next
}

fn current_generation(host: &HtmlElement) -> f64 {
    Reflect::get(host.as_ref(), &JsValue::from_str(GENERATION_PROP))
        .ok()
        .and_then(|value| value.as_f64())
        .unwrap_or(0.0)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetail<'a> {
    kind: &'a str,
    message: String,
}

/// Surface a failed render to the embedding page: console output plus a
/// bubbling `pdf-embed-error` event on the host.
fn report_error(host: &HtmlElement, error: &ViewerError) {
    console_error(&format!("<{TAG_NAME}> render failed: {error}"));

    let detail = ErrorDetail {
        kind: error.kind(),
        message: error.to_string(),
    };
    let Ok(detail) = serde_wasm_bindgen::to_value(&detail) else {
        return;
    };
    let init = CustomEventInit::new();
    init.set_bubbles(true);
    init.set_detail(&detail);
    if let Ok(event) = CustomEvent::new_with_event_init_dict(ERROR_EVENT, &init) {
        let _ = host.dispatch_event(&event);
    }
}

fn console_warn(message: &str) {
    web_sys::console::warn_1(&JsValue::from_str(message));
}

fn console_error(message: &str) {
    web_sys::console::error_1(&JsValue::from_str(message));
}
