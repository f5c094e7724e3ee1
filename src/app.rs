//! Host-side helpers shared by the binary and the browser shell.

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(not(target_arch = "wasm32"))]
use crate::asset::{AssetFetcher, ManualFetcher};
#[cfg(not(target_arch = "wasm32"))]
use crate::capability::CapabilityProbe;
#[cfg(not(target_arch = "wasm32"))]
use crate::config::ViewportConfig;
use crate::render::FrameLog;
#[cfg(not(target_arch = "wasm32"))]
use crate::render::RecordingRenderer;
use crate::tier::RenderTier;
use crate::viewport::{Viewport, ViewportState};

/// Simulated refresh interval of headless runs.
pub const HEADLESS_FRAME: f32 = 1.0 / 60.0;

/// Upper bound on the device pixel ratio used to size render targets.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

/// Backing-store size in device pixels for a target laid out at
/// `css_width` x `css_height` CSS pixels. Never returns a zero dimension.
pub fn backing_size(css_width: f64, css_height: f64, device_pixel_ratio: f64) -> (u32, u32) {
    let ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio.min(MAX_PIXEL_RATIO)
    } else {
        1.0
    };
    let scale = |css: f64| ((css.max(0.0) * ratio).round() as u32).max(1);
    (scale(css_width), scale(css_height))
}

/// How long a headless run waits for its model before carrying on.
#[cfg(not(target_arch = "wasm32"))]
const LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of a headless run.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessSummary {
    pub capability_ok: bool,
    pub history: Vec<RenderTier>,
    pub frame_counts: Vec<(RenderTier, usize)>,
    pub state: ViewportState,
}

impl HeadlessSummary {
    pub fn capture(viewport: &Viewport, log: &FrameLog) -> Self {
        let frame_counts = RenderTier::ALL
            .into_iter()
            .map(|tier| (tier, log.count(tier)))
            .filter(|(_, count)| *count > 0)
            .collect();
        Self {
            capability_ok: viewport.capability_ok(),
            history: viewport.tier_history().to_vec(),
            frame_counts,
            state: viewport.state(),
        }
    }

    pub fn print(&self) {
        let state = &self.state;
        let tiers: Vec<&str> = self.history.iter().map(|tier| tier.name()).collect();
        let counts: Vec<String> = self
            .frame_counts
            .iter()
            .map(|(tier, count)| format!("{tier}={count}"))
            .collect();
        println!("Viewport summary");
        println!(
            " capability: {}",
            if self.capability_ok { "accelerated" } else { "none" }
        );
        println!(" model: {}", state.model_url.as_deref().unwrap_or("(none)"));
        println!(" tiers: {}", tiers.join(" -> "));
        println!(" frames: {}", counts.join(" "));
        println!(" final tier: {}", state.tier);
        if let Some(failure) = &state.last_failure {
            println!(" last failure: {failure}");
        }
        let t = &state.transform;
        println!(
            " transform: rot=({:.3}, {:.3}) spin={:.3} scale={:.3} y={:.3}",
            t.rotation_x, t.rotation_y, t.spin, t.scale, t.position_y
        );
    }
}

/// Mounts a viewport against recording renderers and runs `frames`
/// simulated frames.
///
/// The model request is held back until the first frame has been drawn, so
/// every run with a model starts with one `Loading` frame. The run then waits
/// for the load so the report reflects its outcome.
#[cfg(not(target_arch = "wasm32"))]
pub fn run_headless(
    config: &ViewportConfig,
    probe: &mut dyn CapabilityProbe,
    fetcher: Box<dyn AssetFetcher>,
    frames: u32,
) -> HeadlessSummary {
    let renderer = RecordingRenderer::new();
    let log = renderer.log();
    let held = ManualFetcher::new();
    let mut viewport = Viewport::mount(config, probe, Box::new(held.clone()), Box::new(renderer.clone()));
    viewport.attach_accelerated(Box::new(renderer));

    for index in 0..frames {
        viewport.frame(HEADLESS_FRAME);
        if index == 0 {
            while let Some(completion) = held.take_oldest() {
                let url = completion.url().to_string();
                fetcher.fetch(&url, completion);
            }
            wait_for_load(&viewport, LOAD_TIMEOUT);
        }
    }

    let summary = HeadlessSummary::capture(&viewport, &log.lock());
    viewport.unmount();
    summary
}

#[cfg(not(target_arch = "wasm32"))]
fn wait_for_load(viewport: &Viewport, timeout: Duration) {
    let started = Instant::now();
    while viewport.awaiting_load() {
        if started.elapsed() > timeout {
            log::warn!("model still loading after {timeout:?}; continuing");
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::asset::FileFetcher;
    use crate::capability::FixedProbe;

    fn config_for(url: &str) -> ViewportConfig {
        ViewportConfig {
            model_url: Some(url.to_string()),
            ..ViewportConfig::default()
        }
    }

    #[test]
    fn headless_run_reaches_model_tier() {
        let mut file = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
        writeln!(file, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3").unwrap();
        let url = file.path().to_string_lossy().into_owned();

        let summary = run_headless(&config_for(&url), &mut FixedProbe(true), Box::new(FileFetcher), 30);
        assert_eq!(summary.history, [RenderTier::Loading, RenderTier::Model]);
        assert_eq!(
            summary.frame_counts,
            [(RenderTier::Loading, 1), (RenderTier::Model, 29)]
        );
        assert_eq!(summary.state.model_url.as_deref(), Some(url.as_str()));
    }

    #[test]
    fn headless_run_without_model_shows_placeholder() {
        let summary = run_headless(
            &ViewportConfig::default(),
            &mut FixedProbe(true),
            Box::new(FileFetcher),
            10,
        );
        assert_eq!(summary.history, [RenderTier::Loading, RenderTier::ProceduralFallback]);
        assert_eq!(summary.frame_counts, [(RenderTier::ProceduralFallback, 10)]);
        assert!(summary.state.transform.spin > 0.0);
    }

    #[test]
    fn headless_run_draws_loading_frame_before_a_fast_load() {
        let mut file = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
        writeln!(file, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3").unwrap();
        let url = file.path().to_string_lossy().into_owned();

        for _ in 0..20 {
            let summary =
                run_headless(&config_for(&url), &mut FixedProbe(true), Box::new(FileFetcher), 3);
            assert_eq!(
                summary.frame_counts,
                [(RenderTier::Loading, 1), (RenderTier::Model, 2)]
            );
        }
    }

    #[test]
    fn backing_size_caps_the_pixel_ratio() {
        assert_eq!(backing_size(300.0, 150.0, 1.0), (300, 150));
        assert_eq!(backing_size(300.0, 150.0, 1.5), (450, 225));
        assert_eq!(backing_size(300.0, 150.0, 3.0), (600, 300));
        assert_eq!(backing_size(0.0, 150.0, f64::NAN), (1, 150));
    }

    #[test]
    fn headless_run_without_capability_is_flat() {
        let summary = run_headless(
            &config_for("missing.obj"),
            &mut FixedProbe(false),
            Box::new(FileFetcher),
            5,
        );
        assert_eq!(summary.state.tier, RenderTier::FlatFallback);
        assert_eq!(summary.frame_counts, [(RenderTier::FlatFallback, 5)]);
    }
}
