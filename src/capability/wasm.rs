use log::info;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlCanvasElement};

use super::CapabilityProbe;

const CONTEXT_KINDS: [&str; 3] = ["webgl2", "webgl", "experimental-webgl"];

/// Probes for WebGL on a detached scratch canvas.
pub struct WebGlProbe {
    document: Document,
}

impl WebGlProbe {
    pub fn new(document: Document) -> Self {
        Self { document }
    }
}

impl CapabilityProbe for WebGlProbe {
    fn probe(&mut self) -> bool {
        let Some(scratch) = ScratchCanvas::create(&self.document) else {
            return false;
        };
        let found = CONTEXT_KINDS.iter().find(|kind| {
            matches!(scratch.canvas.get_context(kind), Ok(Some(_)))
        });
        match found {
            Some(kind) => {
                info!("WebGL available via {kind}");
                true
            }
            None => {
                info!("WebGL unavailable");
                false
            }
        }
    }
}

/// Throwaway canvas, shrunk to zero on drop so the browser can reclaim any
/// context created on it.
struct ScratchCanvas {
    canvas: HtmlCanvasElement,
}

impl ScratchCanvas {
    fn create(document: &Document) -> Option<Self> {
        let canvas = document
            .create_element("canvas")
            .ok()?
            .dyn_into::<HtmlCanvasElement>()
            .ok()?;
        canvas.set_width(1);
        canvas.set_height(1);
        Some(Self { canvas })
    }
}

impl Drop for ScratchCanvas {
    fn drop(&mut self) {
        self.canvas.set_width(0);
        self.canvas.set_height(0);
    }
}
