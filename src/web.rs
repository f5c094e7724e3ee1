#![cfg(target_arch = "wasm32")]

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use gloo_events::EventListener;
use log::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, Document, HtmlCanvasElement, HtmlElement, MouseEvent};

use crate::app::backing_size;
use crate::asset::wasm::HttpFetcher;
use crate::capability::wasm::WebGlProbe;
use crate::config::ViewportConfig;
use crate::pointer::BoundingBox;
use crate::render::{CardRenderer, GpuRenderer};
use crate::tier::RenderTier;
use crate::viewport::Viewport;

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    let _ = wasm_logger::init(wasm_logger::Config::default());
}

/// Hero viewport mounted into a DOM container.
///
/// The widget lives until [`HeroViewport::unmount`] is called or the handle
/// is freed from JavaScript.
#[wasm_bindgen]
pub struct HeroViewport {
    shell: Rc<RefCell<Shell>>,
}

#[wasm_bindgen]
impl HeroViewport {
    /// Mounts the viewport into the element with id `container_id` and
    /// starts loading `model_url`. An empty URL shows the placeholder.
    pub async fn mount(container_id: String, model_url: String) -> Result<HeroViewport, JsValue> {
        let window = window().ok_or_else(|| JsValue::from_str("window not available"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("document not available"))?;
        let container = document
            .get_element_by_id(&container_id)
            .ok_or_else(|| JsValue::from_str("container element not found"))?
            .dyn_into::<HtmlElement>()
            .map_err(|_| JsValue::from_str("container is not an HTML element"))?;

        let (width, height) = container_size(&container);
        let gl_canvas = create_canvas(&document, &container, width, height)?;
        let card_canvas = create_canvas(&document, &container, width, height)?;
        set_visible(&card_canvas, false);

        let card = CardRenderer::new(card_canvas.clone())
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        let config = ViewportConfig {
            model_url: (!model_url.is_empty()).then_some(model_url),
            ..ViewportConfig::default()
        };
        let mut probe = WebGlProbe::new(document.clone());
        let mut viewport = Viewport::mount(&config, &mut probe, Box::new(HttpFetcher), Box::new(card));

        if viewport.capability_ok() {
            let target = wgpu::SurfaceTarget::Canvas(gl_canvas.clone());
            match GpuRenderer::new(target, width, height, config.camera).await {
                Ok(renderer) => viewport.attach_accelerated(Box::new(renderer)),
                Err(err) => warn!("GPU renderer unavailable: {err:#}"),
            }
        }
        viewport.resize(width, height);

        let shell = Rc::new(RefCell::new(Shell {
            viewport,
            container,
            gl_canvas,
            card_canvas,
            size: (width, height),
            accelerated_shown: true,
            last_timestamp: None,
            listeners: Vec::new(),
            frames: None,
        }));
        let listeners = attach_pointer_listeners(&shell);
        let frames = FrameLoop::start(Rc::downgrade(&shell))?;
        {
            let mut state = shell.borrow_mut();
            state.listeners = listeners;
            state.frames = Some(frames);
        }
        Ok(Self { shell })
    }

    /// Stops the frame loop, detaches listeners and removes the canvases.
    pub fn unmount(&self) {
        self.shell.borrow_mut().teardown();
    }

    /// Name of the tier currently shown.
    pub fn tier(&self) -> String {
        self.shell.borrow().viewport.tier().name().to_string()
    }
}

struct Shell {
    viewport: Viewport,
    container: HtmlElement,
    gl_canvas: HtmlCanvasElement,
    card_canvas: HtmlCanvasElement,
    size: (u32, u32),
    accelerated_shown: bool,
    last_timestamp: Option<f64>,
    listeners: Vec<EventListener>,
    frames: Option<FrameLoop>,
}

impl Shell {
    fn on_frame(&mut self, timestamp: f64) {
        let dt = self
            .last_timestamp
            .map_or(0.0, |last| ((timestamp - last) / 1000.0) as f32);
        self.last_timestamp = Some(timestamp);
        self.sync_size();
        let tier = self.viewport.frame(dt);
        self.show(tier);
    }

    fn sync_size(&mut self) {
        let size = container_size(&self.container);
        if size == self.size {
            return;
        }
        self.size = size;
        self.gl_canvas.set_width(size.0);
        self.gl_canvas.set_height(size.1);
        self.viewport.resize(size.0, size.1);
    }

    fn show(&mut self, tier: RenderTier) {
        let accelerated = tier.is_accelerated();
        if accelerated != self.accelerated_shown {
            set_visible(&self.gl_canvas, accelerated);
            set_visible(&self.card_canvas, !accelerated);
            self.accelerated_shown = accelerated;
        }
    }

    fn update_bounds(&mut self) {
        let rect = self.container.get_bounding_client_rect();
        self.viewport.set_bounds(BoundingBox::new(
            rect.left() as f32,
            rect.top() as f32,
            rect.width() as f32,
            rect.height() as f32,
        ));
    }

    fn teardown(&mut self) {
        if let Some(frames) = self.frames.take() {
            frames.stop();
        }
        self.listeners.clear();
        self.viewport.unmount();
        self.gl_canvas.remove();
        self.card_canvas.remove();
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn attach_pointer_listeners(shell: &Rc<RefCell<Shell>>) -> Vec<EventListener> {
    let container = shell.borrow().container.clone();
    let mut listeners = Vec::new();

    {
        let shell = Rc::downgrade(shell);
        listeners.push(EventListener::new(&container, "mousemove", move |event| {
            let (Some(shell), Some(event)) = (shell.upgrade(), event.dyn_ref::<MouseEvent>()) else {
                return;
            };
            let mut shell = shell.borrow_mut();
            shell.update_bounds();
            shell
                .viewport
                .pointer_move(event.client_x() as f32, event.client_y() as f32);
        }));
    }

    {
        let shell = Rc::downgrade(shell);
        listeners.push(EventListener::new(&container, "mouseenter", move |_| {
            if let Some(shell) = shell.upgrade() {
                shell.borrow_mut().viewport.pointer_enter();
            }
        }));
    }

    {
        let shell = Rc::downgrade(shell);
        listeners.push(EventListener::new(&container, "mouseleave", move |_| {
            if let Some(shell) = shell.upgrade() {
                shell.borrow_mut().viewport.pointer_leave();
            }
        }));
    }

    listeners
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// `requestAnimationFrame` loop. The callback keeps itself alive until
/// [`FrameLoop::stop`] drops it.
struct FrameLoop {
    callback: FrameCallback,
    handle: Rc<Cell<Option<i32>>>,
}

impl FrameLoop {
    fn start(shell: Weak<RefCell<Shell>>) -> Result<Self, JsValue> {
        let callback: FrameCallback = Rc::new(RefCell::new(None));
        let handle = Rc::new(Cell::new(None));

        let next = Rc::clone(&callback);
        let next_handle = Rc::clone(&handle);
        *callback.borrow_mut() = Some(Closure::new(move |timestamp: f64| {
            let Some(shell) = shell.upgrade() else {
                return;
            };
            if let Ok(mut shell) = shell.try_borrow_mut() {
                shell.on_frame(timestamp);
            }
            match request_frame(&next) {
                Ok(id) => next_handle.set(Some(id)),
                Err(err) => warn!("frame loop stopped: {err:?}"),
            }
        }));

        handle.set(Some(request_frame(&callback)?));
        Ok(Self { callback, handle })
    }

    fn stop(self) {
        if let (Some(id), Some(window)) = (self.handle.take(), window()) {
            let _ = window.cancel_animation_frame(id);
        }
        self.callback.borrow_mut().take();
    }
}

fn request_frame(callback: &FrameCallback) -> Result<i32, JsValue> {
    let window = window().ok_or_else(|| JsValue::from_str("window not available"))?;
    let callback = callback.borrow();
    let callback = callback
        .as_ref()
        .ok_or_else(|| JsValue::from_str("frame callback released"))?;
    window.request_animation_frame(callback.as_ref().unchecked_ref())
}

/// Size of the container in device pixels, so canvases stay sharp on HiDPI
/// screens.
fn container_size(container: &HtmlElement) -> (u32, u32) {
    let ratio = window().map_or(1.0, |window| window.device_pixel_ratio());
    backing_size(
        f64::from(container.client_width()),
        f64::from(container.client_height()),
        ratio,
    )
}

fn create_canvas(
    document: &Document,
    container: &HtmlElement,
    width: u32,
    height: u32,
) -> Result<HtmlCanvasElement, JsValue> {
    let canvas = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| JsValue::from_str("failed to create canvas"))?;
    canvas.set_width(width);
    canvas.set_height(height);
    let style = canvas.style();
    style.set_property("width", "100%")?;
    style.set_property("height", "100%")?;
    style.set_property("display", "block")?;
    container.append_child(&canvas)?;
    Ok(canvas)
}

fn set_visible(canvas: &HtmlCanvasElement, visible: bool) {
    let display = if visible { "block" } else { "none" };
    let _ = canvas.style().set_property("display", display);
}
