use anyhow::{anyhow, Result};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::procedural::{ACCENT_COLOR, PRIMARY_COLOR};
use crate::tier::RenderTier;

use super::common::{Frame, FrameRenderer, RenderError};

/// Fraction of the canvas covered by the card at unit scale.
const CARD_FRACTION: f64 = 0.55;

/// 2D canvas renderer for the flat card and the static message.
pub struct CardRenderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    size: (u32, u32),
}

impl CardRenderer {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self> {
        let context = canvas
            .get_context("2d")
            .map_err(|err| anyhow!("failed to query canvas context: {err:?}"))?
            .ok_or_else(|| anyhow!("canvas does not support 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| anyhow!("failed to cast canvas context"))?;
        let size = (canvas.width(), canvas.height());
        Ok(Self {
            canvas,
            context,
            size,
        })
    }

    fn draw_card(&self, frame: &Frame<'_>) -> Result<(), JsValue> {
        let ctx = &self.context;
        let (width, height) = (self.size.0 as f64, self.size.1 as f64);
        let t = frame.transform;
        let side = width.min(height) * CARD_FRACTION;

        // Tilt is faked by foreshortening each axis and skewing along the other.
        let scale = t.scale as f64;
        let sx = (t.rotation_y as f64).cos() * scale;
        let sy = (t.rotation_x as f64).cos() * scale;
        let skew_x = (t.rotation_x as f64).sin() * 0.25;
        let skew_y = -(t.rotation_y as f64).sin() * 0.25;
        let lift = -t.position_y as f64 * side;
        ctx.set_transform(sx, skew_y, skew_x, sy, width / 2.0, height / 2.0 + lift)?;

        let half = side / 2.0;
        let (dx, dy) = ((t.spin as f64).cos() * half, (t.spin as f64).sin() * half);
        let gradient = ctx.create_linear_gradient(-dx, -dy, dx, dy);
        gradient.add_color_stop(0.0, &css_hex(PRIMARY_COLOR))?;
        gradient.add_color_stop(1.0, &css_hex(ACCENT_COLOR))?;
        ctx.set_fill_style(&gradient.into());
        ctx.fill_rect(-half, -half, side, side);

        if frame.hovered {
            ctx.set_stroke_style(&"rgba(255, 255, 255, 0.8)".into());
            ctx.set_line_width(3.0);
            ctx.stroke_rect(-half, -half, side, side);
        }

        ctx.set_fill_style(&"white".into());
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        ctx.set_font(&format!("bold {}px sans-serif", (side / 6.0).round()));
        ctx.fill_text(frame.message, 0.0, 0.0)?;
        Ok(())
    }

    fn draw_message(&self, message: &str) -> Result<(), JsValue> {
        let ctx = &self.context;
        ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)?;
        ctx.set_fill_style(&"#4a4a68".into());
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        ctx.set_font("16px sans-serif");
        ctx.fill_text(
            message,
            self.size.0 as f64 / 2.0,
            self.size.1 as f64 / 2.0,
        )
    }
}

impl FrameRenderer for CardRenderer {
    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
        self.context.reset_transform().map_err(canvas_error)?;
        self.context
            .clear_rect(0.0, 0.0, self.size.0 as f64, self.size.1 as f64);
        let drawn = match frame.tier {
            RenderTier::FlatFallback => self.draw_card(frame),
            RenderTier::Unsupported => self.draw_message(frame.message),
            tier => return Err(RenderError::Unavailable(tier)),
        };
        drawn.map_err(canvas_error)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size = (width, height);
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }
}

fn css_hex(rgb: u32) -> String {
    format!("#{rgb:06x}")
}

fn canvas_error(err: JsValue) -> RenderError {
    RenderError::Canvas(
        err.as_string()
            .unwrap_or_else(|| format!("{err:?}")),
    )
}
