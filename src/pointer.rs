use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Host-supplied layout rectangle of the widget, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Box anchored at the origin, as reported by a window's inner size.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.left + self.width * 0.5, self.top + self.height * 0.5)
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.left && px <= self.left + self.width && py >= self.top && py <= self.top + self.height
    }
}

/// Pointer position in normalized device coordinates plus the hover flag.
///
/// `x` grows to the right and `y` grows upward, both within `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerTracker {
    position: Vec2,
    hovered: bool,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a pointer move at pixel `(px, py)` and returns the normalized
    /// coordinates. Points outside `bounds` are clamped onto its edge.
    pub fn on_move(&mut self, px: f32, py: f32, bounds: &BoundingBox) -> Vec2 {
        self.position = normalize(px, py, bounds);
        self.position
    }

    pub fn on_enter(&mut self) {
        self.hovered = true;
    }

    pub fn on_leave(&mut self) {
        self.hovered = false;
        self.position = Vec2::ZERO;
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }
}

/// Maps pixel coordinates inside `bounds` to `[-1, 1] x [-1, 1]`.
pub fn normalize(px: f32, py: f32, bounds: &BoundingBox) -> Vec2 {
    let axis = |offset: f32, extent: f32| {
        if extent > 0.0 && offset.is_finite() {
            (offset / extent * 2.0 - 1.0).clamp(-1.0, 1.0)
        } else {
            0.0
        }
    };
    Vec2::new(
        axis(px - bounds.left, bounds.width),
        -axis(py - bounds.top, bounds.height),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOX: BoundingBox = BoundingBox::new(100.0, 50.0, 400.0, 200.0);

    #[test]
    fn center_maps_to_origin() {
        let mut tracker = PointerTracker::new();
        let center = BOX.center();
        assert_eq!(tracker.on_move(center.x, center.y, &BOX), Vec2::ZERO);
    }

    #[test]
    fn corners_map_to_unit_square_with_up_positive() {
        assert_eq!(normalize(100.0, 50.0, &BOX), Vec2::new(-1.0, 1.0));
        assert_eq!(normalize(500.0, 250.0, &BOX), Vec2::new(1.0, -1.0));
        assert_eq!(normalize(500.0, 50.0, &BOX), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn in_bounds_positions_stay_in_range() {
        for step_x in 0..=40 {
            for step_y in 0..=20 {
                let px = BOX.left + step_x as f32 * 10.0;
                let py = BOX.top + step_y as f32 * 10.0;
                assert!(BOX.contains(px, py));
                let p = normalize(px, py, &BOX);
                assert!((-1.0..=1.0).contains(&p.x) && (-1.0..=1.0).contains(&p.y), "{p:?}");
            }
        }
    }

    #[test]
    fn outside_positions_are_clamped() {
        assert_eq!(normalize(-1000.0, 9000.0, &BOX), Vec2::new(-1.0, -1.0));
    }

    #[test]
    fn degenerate_box_maps_to_zero() {
        let flat = BoundingBox::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(normalize(10.0, 10.0, &flat), Vec2::ZERO);
    }

    #[test]
    fn leaving_resets_position_and_hover() {
        let mut tracker = PointerTracker::new();
        tracker.on_enter();
        tracker.on_move(480.0, 60.0, &BOX);
        assert!(tracker.is_hovered());
        assert_ne!(tracker.position(), Vec2::ZERO);
        tracker.on_leave();
        assert!(!tracker.is_hovered());
        assert_eq!(tracker.position(), Vec2::ZERO);
    }
}
