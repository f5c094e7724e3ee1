//! The hero viewport widget.
//!
//! [`Viewport`] ties the capability probe, the pointer tracker, the asset
//! loader, the motion state and the tier machine together. A host calls
//! [`Viewport::frame`] once per display refresh and forwards pointer events
//! in between; the widget picks the tier and the renderer for every frame.

use std::sync::Arc;

use glam::Vec2;
use log::{debug, info, warn};

use crate::asset::{AssetFetcher, AssetLoader};
use crate::capability::CapabilityProbe;
use crate::config::ViewportConfig;
use crate::motion::{Motion, MotionProfile, MotionProfiles, Transform};
use crate::pointer::{BoundingBox, PointerTracker};
use crate::procedural;
use crate::render::{Frame, FrameRenderer, RenderError};
use crate::scene::SceneGraph;
use crate::tier::{LoadState, RenderTier, TierMachine};

/// Caption of the flat card when the host has no accelerated context.
pub const NO_WEBGL_MESSAGE: &str = "WebGL not supported";
/// Caption of the flat card after the accelerated renderer failed.
pub const RENDER_FAILED_MESSAGE: &str = "3D rendering not supported";
/// Text of the static message tier.
pub const UNSUPPORTED_MESSAGE: &str = "3D preview unavailable";

/// Snapshot of the widget for hosts and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportState {
    pub tier: RenderTier,
    pub load: LoadState,
    pub model_url: Option<String>,
    pub pointer: Vec2,
    pub hovered: bool,
    pub transform: Transform,
    pub elapsed: f32,
    pub mounted: bool,
    /// Most recent render failure that demoted the tier.
    pub last_failure: Option<String>,
}

pub struct Viewport {
    tiers: TierMachine,
    loader: AssetLoader,
    pointer: PointerTracker,
    bounds: BoundingBox,
    profiles: MotionProfiles,
    motion: Motion,
    model: Option<Arc<SceneGraph>>,
    loading_scene: SceneGraph,
    placeholder: SceneGraph,
    accelerated: Option<Box<dyn FrameRenderer>>,
    flat: Box<dyn FrameRenderer>,
    flat_message: &'static str,
    last_failure: Option<String>,
    mounted: bool,
}

impl Viewport {
    /// Probes for acceleration, enters the first tier and starts loading the
    /// configured model. Without a model the placeholder is shown right away.
    ///
    /// Mounting never blocks on the load.
    /// Accelerated tiers draw through the renderer given to
    /// [`Viewport::attach_accelerated`].
    pub fn mount(
        config: &ViewportConfig,
        probe: &mut dyn CapabilityProbe,
        fetcher: Box<dyn AssetFetcher>,
        flat: Box<dyn FrameRenderer>,
    ) -> Self {
        let capability_ok = probe.probe();
        let tiers = TierMachine::new(capability_ok);
        let profiles = config.profiles;
        let motion = Motion::new(profiles.for_tier(tiers.current()).unwrap_or(&profiles.loading));
        info!("viewport mounted in {} tier", tiers.current());

        let mut viewport = Self {
            tiers,
            loader: AssetLoader::new(fetcher),
            pointer: PointerTracker::new(),
            bounds: BoundingBox::from_size(1, 1),
            profiles,
            motion,
            model: None,
            loading_scene: procedural::loading_cube(),
            placeholder: procedural::placeholder(),
            accelerated: None,
            flat,
            flat_message: if capability_ok {
                RENDER_FAILED_MESSAGE
            } else {
                NO_WEBGL_MESSAGE
            },
            last_failure: None,
            mounted: true,
        };
        match &config.model_url {
            Some(url) => {
                viewport.load(url);
            }
            None => {
                debug!("no model configured; showing the placeholder");
                viewport.tiers.settle(false);
            }
        }
        viewport
    }

    /// Installs the renderer used by `Loading`, `Model` and
    /// `ProceduralFallback`. Ignored when the host lacks acceleration.
    pub fn attach_accelerated(&mut self, renderer: Box<dyn FrameRenderer>) {
        if self.tiers.capability_ok() && self.mounted {
            self.accelerated = Some(renderer);
        } else {
            debug!("ignoring accelerated renderer without capability");
        }
    }

    pub fn capability_ok(&self) -> bool {
        self.tiers.capability_ok()
    }

    /// Starts loading `url`. Returns `false` when the request was a no-op
    /// (same URL already loading or loaded, or the widget is unmounted).
    pub fn load(&mut self, url: &str) -> bool {
        if !self.mounted || !self.loader.load(url) {
            return false;
        }
        self.model = None;
        self.tiers.begin_load();
        true
    }

    /// Updates the layout rectangle used to normalize pointer positions.
    pub fn set_bounds(&mut self, bounds: BoundingBox) {
        self.bounds = bounds;
    }

    /// Forwards a resize to the attached renderers and keeps the bounds in
    /// step with it.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.bounds = BoundingBox::new(self.bounds.left, self.bounds.top, width as f32, height as f32);
        if let Some(renderer) = self.accelerated.as_mut() {
            renderer.resize(width, height);
        }
        self.flat.resize(width, height);
    }

    pub fn pointer_move(&mut self, px: f32, py: f32) -> Vec2 {
        self.pointer.on_move(px, py, &self.bounds)
    }

    pub fn pointer_enter(&mut self) {
        self.pointer.on_enter();
    }

    pub fn pointer_leave(&mut self) {
        self.pointer.on_leave();
    }

    /// Whether a load was issued and its result has not arrived yet.
    pub fn awaiting_load(&self) -> bool {
        self.loader.in_flight() && !self.loader.is_settled()
    }

    pub fn tier(&self) -> RenderTier {
        self.tiers.current()
    }

    pub fn tier_history(&self) -> &[RenderTier] {
        self.tiers.history()
    }

    pub fn state(&self) -> ViewportState {
        ViewportState {
            tier: self.tiers.current(),
            load: self.tiers.load_state(),
            model_url: self.loader.url().map(str::to_string),
            pointer: self.pointer.position(),
            hovered: self.pointer.is_hovered(),
            transform: *self.motion.transform(),
            elapsed: self.motion.elapsed(),
            mounted: self.mounted,
            last_failure: self.last_failure.clone(),
        }
    }

    /// Advances the widget by `dt` seconds and draws one frame.
    ///
    /// A load that settled since the previous call switches the tier before
    /// anything is drawn. A failing draw demotes the tier for the next frame.
    pub fn frame(&mut self, dt: f32) -> RenderTier {
        if !self.mounted {
            return self.tiers.current();
        }
        self.apply_settled();

        let tier = self.tiers.current();
        if let Err(err) = self.draw(tier, dt) {
            warn!("render failed in {tier} tier: {err}");
            self.last_failure = Some(format!("{tier}: {err}"));
            let next = self.tiers.demote_after_failure();
            if !next.is_accelerated() && self.accelerated.take().is_some() {
                debug!("released accelerated renderer");
            }
            if next == RenderTier::FlatFallback {
                self.flat_message = RENDER_FAILED_MESSAGE;
            }
        }
        self.tiers.current()
    }

    /// Stops loading and releases the renderers. Later frames and loads are
    /// no-ops.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.loader.cancel();
        self.accelerated = None;
        info!("viewport unmounted in {} tier", self.tiers.current());
    }

    fn apply_settled(&mut self) {
        let Some(outcome) = self.loader.take_settled() else {
            return;
        };
        match outcome {
            Ok(scene) => {
                info!(
                    "model {} ready: {} triangles",
                    scene.label,
                    scene.triangle_count()
                );
                self.model = Some(scene);
                self.tiers.settle(true);
            }
            Err(_) => {
                self.model = None;
                self.tiers.settle(false);
            }
        }
    }

    fn draw(&mut self, tier: RenderTier, dt: f32) -> Result<(), RenderError> {
        let profile = self.profiles.for_tier(tier).copied();
        if let Some(profile) = profile {
            self.tick(dt, &profile);
        }
        let transform = *self.motion.transform();
        let frame = Frame {
            tier,
            transform: &transform,
            scene: match tier {
                RenderTier::Loading => Some(&self.loading_scene),
                RenderTier::Model => self.model.as_deref(),
                RenderTier::ProceduralFallback => Some(&self.placeholder),
                RenderTier::FlatFallback | RenderTier::Unsupported => None,
            },
            message: match tier {
                RenderTier::Unsupported => UNSUPPORTED_MESSAGE,
                _ => self.flat_message,
            },
            hovered: self.pointer.is_hovered(),
            elapsed: self.motion.elapsed(),
        };

        if tier.is_accelerated() {
            match self.accelerated.as_mut() {
                Some(renderer) => renderer.render(&frame),
                None => Err(RenderError::Unavailable(tier)),
            }
        } else {
            self.flat.render(&frame)
        }
    }

    fn tick(&mut self, dt: f32, profile: &MotionProfile) {
        self.motion
            .tick(dt, self.pointer.position(), self.pointer.is_hovered(), profile);
    }
}

impl Drop for Viewport {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::asset::{LoadError, ManualFetcher};
    use crate::capability::FixedProbe;
    use crate::render::{FrameLog, RecordingRenderer};

    const FRAME: f32 = 1.0 / 60.0;
    const TRIANGLE: &[u8] = b"o tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    struct Harness {
        viewport: Viewport,
        fetcher: ManualFetcher,
        log: Arc<Mutex<FrameLog>>,
    }

    fn mount(capability: bool, url: Option<&str>, renderer: RecordingRenderer) -> Harness {
        let fetcher = ManualFetcher::new();
        let log = renderer.log();
        let config = ViewportConfig {
            model_url: url.map(str::to_string),
            ..ViewportConfig::default()
        };
        let mut viewport = Viewport::mount(
            &config,
            &mut FixedProbe(capability),
            Box::new(fetcher.clone()),
            Box::new(renderer.clone()),
        );
        viewport.attach_accelerated(Box::new(renderer));
        viewport.set_bounds(BoundingBox::new(0.0, 0.0, 200.0, 100.0));
        Harness {
            viewport,
            fetcher,
            log,
        }
    }

    #[test]
    fn no_capability_shows_flat_card_whatever_the_load() {
        for success in [true, false] {
            let mut h = mount(false, Some("spider.obj"), RecordingRenderer::new());
            assert_eq!(h.viewport.tier(), RenderTier::FlatFallback);
            assert_eq!(
                h.viewport.tier_history(),
                [RenderTier::Loading, RenderTier::Unsupported, RenderTier::FlatFallback]
            );
            let bytes = if success {
                Ok(TRIANGLE.to_vec())
            } else {
                Err(LoadError::Fetch {
                    url: "spider.obj".into(),
                    reason: "404".into(),
                })
            };
            h.fetcher.take_oldest().unwrap().settle(bytes);
            for _ in 0..3 {
                assert_eq!(h.viewport.frame(FRAME), RenderTier::FlatFallback);
            }
            assert_eq!(h.log.lock().count(RenderTier::FlatFallback), 3);
        }
    }

    #[test]
    fn unsettled_load_keeps_loading_while_spinning() {
        let mut h = mount(true, Some("spider.obj"), RecordingRenderer::new());
        let mut last_spin = 0.0;
        for _ in 0..120 {
            assert_eq!(h.viewport.frame(FRAME), RenderTier::Loading);
            let spin = h.viewport.state().transform.spin;
            assert!(spin > last_spin);
            last_spin = spin;
        }
        let log = h.log.lock();
        assert_eq!(log.count(RenderTier::Loading), 120);
        let last = log.last.as_ref().unwrap();
        assert_eq!(last.scene_label.as_deref(), Some(procedural::LOADING_LABEL));
    }

    #[test]
    fn failed_load_switches_to_placeholder_on_next_frame() {
        let mut h = mount(true, Some("spider.obj"), RecordingRenderer::new());
        h.viewport.frame(FRAME);
        h.fetcher.take_oldest().unwrap().settle(Err(LoadError::Fetch {
            url: "spider.obj".into(),
            reason: "network down".into(),
        }));
        assert_eq!(h.viewport.tier(), RenderTier::Loading);
        assert_eq!(h.viewport.frame(FRAME), RenderTier::ProceduralFallback);
        let log = h.log.lock();
        let last = log.last.as_ref().unwrap();
        assert_eq!(last.tier, RenderTier::ProceduralFallback);
        assert_eq!(last.scene_label.as_deref(), Some(procedural::PLACEHOLDER_LABEL));
    }

    #[test]
    fn successful_load_draws_the_model() {
        let mut h = mount(true, Some("spider.obj"), RecordingRenderer::new());
        h.fetcher.take_oldest().unwrap().settle(Ok(TRIANGLE.to_vec()));
        assert_eq!(h.viewport.frame(FRAME), RenderTier::Model);
        let log = h.log.lock();
        let last = log.last.as_ref().unwrap();
        assert_eq!(last.scene_label.as_deref(), Some("spider.obj"));
        assert_eq!(last.triangles, 1);
    }

    #[test]
    fn pointer_at_centre_is_origin_and_leave_resets() {
        let mut h = mount(true, None, RecordingRenderer::new());
        h.viewport.pointer_enter();
        assert_eq!(h.viewport.pointer_move(100.0, 50.0), Vec2::ZERO);
        h.viewport.pointer_move(200.0, 0.0);
        assert_eq!(h.viewport.state().pointer, Vec2::new(1.0, 1.0));
        h.viewport.pointer_leave();
        let state = h.viewport.state();
        assert_eq!(state.pointer, Vec2::ZERO);
        assert!(!state.hovered);
    }

    #[test]
    fn pointer_update_is_visible_to_the_next_frame() {
        let mut h = mount(true, Some("spider.obj"), RecordingRenderer::new());
        h.fetcher.take_oldest().unwrap().settle(Ok(TRIANGLE.to_vec()));
        h.viewport.frame(FRAME);
        h.viewport.pointer_enter();
        h.viewport.pointer_move(200.0, 50.0);
        h.viewport.frame(FRAME);
        let last = h.log.lock().last.clone().unwrap();
        assert!(last.hovered);
        assert!(last.transform.rotation_y > 0.0);
    }

    #[test]
    fn unmount_during_load_ignores_late_result() {
        let mut h = mount(true, Some("spider.obj"), RecordingRenderer::new());
        h.viewport.frame(FRAME);
        h.viewport.unmount();
        let late = h.fetcher.take_oldest().unwrap();
        assert!(!late.settle(Ok(TRIANGLE.to_vec())));
        assert_eq!(h.viewport.frame(FRAME), RenderTier::Loading);
        assert!(!h.viewport.state().mounted);
        assert!(!h.viewport.load("other.obj"));
        assert_eq!(h.log.lock().frames, 1);
    }

    #[test]
    fn superseded_url_result_is_discarded() {
        let mut h = mount(true, Some("a.obj"), RecordingRenderer::new());
        assert!(h.viewport.load("b.obj"));
        assert!(!h.viewport.load("b.obj"));
        let stale = h.fetcher.take_oldest().unwrap();
        assert!(!stale.settle(Ok(TRIANGLE.to_vec())));
        assert_eq!(h.viewport.frame(FRAME), RenderTier::Loading);

        h.fetcher.take_newest().unwrap().settle(Ok(TRIANGLE.to_vec()));
        assert_eq!(h.viewport.frame(FRAME), RenderTier::Model);
        assert_eq!(h.viewport.state().model_url.as_deref(), Some("b.obj"));
    }

    #[test]
    fn model_render_failure_demotes_to_placeholder() {
        let mut h = mount(true, Some("a.obj"), RecordingRenderer::failing_in(RenderTier::Model));
        h.fetcher.take_oldest().unwrap().settle(Ok(TRIANGLE.to_vec()));
        assert_eq!(h.viewport.frame(FRAME), RenderTier::ProceduralFallback);
        assert_eq!(h.viewport.frame(FRAME), RenderTier::ProceduralFallback);
        assert_eq!(h.log.lock().count(RenderTier::ProceduralFallback), 1);

        // A fresh load settles below the floor.
        h.viewport.load("b.obj");
        h.fetcher.take_newest().unwrap().settle(Ok(TRIANGLE.to_vec()));
        assert_eq!(h.viewport.frame(FRAME), RenderTier::ProceduralFallback);
    }

    #[test]
    fn missing_accelerated_renderer_falls_back_to_flat() {
        let fetcher = ManualFetcher::new();
        let flat = RecordingRenderer::new();
        let log = flat.log();
        let mut viewport = Viewport::mount(
            &ViewportConfig::default(),
            &mut FixedProbe(true),
            Box::new(fetcher),
            Box::new(flat),
        );
        assert_eq!(viewport.frame(FRAME), RenderTier::FlatFallback);
        assert_eq!(viewport.frame(FRAME), RenderTier::FlatFallback);
        assert_eq!(log.lock().count(RenderTier::FlatFallback), 1);
        assert_eq!(
            viewport.state().last_failure.as_deref(),
            Some("procedural-fallback: no renderer is attached for the procedural-fallback tier")
        );
    }

    #[test]
    fn mounting_without_model_shows_placeholder() {
        let mut h = mount(true, None, RecordingRenderer::new());
        assert_eq!(
            h.viewport.tier_history(),
            [RenderTier::Loading, RenderTier::ProceduralFallback]
        );
        assert_eq!(h.fetcher.pending_count(), 0);
        assert_eq!(h.viewport.frame(FRAME), RenderTier::ProceduralFallback);

        assert!(h.viewport.load("late.obj"));
        assert_eq!(h.viewport.tier(), RenderTier::Loading);
        h.fetcher.take_oldest().unwrap().settle(Ok(TRIANGLE.to_vec()));
        assert_eq!(h.viewport.frame(FRAME), RenderTier::Model);
    }

    #[test]
    fn flat_failure_leaves_static_message() {
        let mut h = mount(false, None, RecordingRenderer::failing_in(RenderTier::FlatFallback));
        assert_eq!(h.viewport.frame(FRAME), RenderTier::Unsupported);
        assert_eq!(h.viewport.frame(FRAME), RenderTier::Unsupported);
        assert_eq!(h.log.lock().count(RenderTier::Unsupported), 1);
        let frozen = h.viewport.state().transform;
        h.viewport.frame(FRAME);
        assert_eq!(h.viewport.state().transform, frozen);
    }
}
