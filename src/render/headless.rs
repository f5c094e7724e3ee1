use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::motion::Transform;
use crate::tier::RenderTier;

use super::common::{Frame, FrameRenderer, RenderError};

/// What a recorded frame looked like.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub tier: RenderTier,
    pub transform: Transform,
    pub scene_label: Option<String>,
    pub triangles: usize,
    pub hovered: bool,
}

/// Shared log written by [`RecordingRenderer`].
#[derive(Debug, Default)]
pub struct FrameLog {
    pub frames: usize,
    pub per_tier: HashMap<RenderTier, usize>,
    pub last: Option<FrameRecord>,
}

impl FrameLog {
    pub fn count(&self, tier: RenderTier) -> usize {
        self.per_tier.get(&tier).copied().unwrap_or(0)
    }
}

/// Renderer that draws nothing and records each frame instead.
///
/// Used by the summary mode of the binary and by tests. Clones share the same
/// log, so a host can keep one handle while the viewport owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    log: Arc<Mutex<FrameLog>>,
    fail_in: Option<RenderTier>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every frame drawn in `tier` fails with [`RenderError::Surface`].
    pub fn failing_in(tier: RenderTier) -> Self {
        Self {
            fail_in: Some(tier),
            ..Self::default()
        }
    }

    pub fn log(&self) -> Arc<Mutex<FrameLog>> {
        Arc::clone(&self.log)
    }
}

impl FrameRenderer for RecordingRenderer {
    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
        if self.fail_in == Some(frame.tier) {
            return Err(RenderError::Surface(format!(
                "simulated failure in {} tier",
                frame.tier
            )));
        }
        let mut log = self.log.lock();
        log.frames += 1;
        *log.per_tier.entry(frame.tier).or_default() += 1;
        log.last = Some(FrameRecord {
            tier: frame.tier,
            transform: *frame.transform,
            scene_label: frame.scene.map(|scene| scene.label.clone()),
            triangles: frame.scene.map_or(0, |scene| scene.triangle_count()),
            hovered: frame.hovered,
        });
        Ok(())
    }
}
