use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::tier::RenderTier;

/// Per-tier motion constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    /// Radians of X rotation per unit of vertical pointer offset.
    pub gain_x: f32,
    /// Radians of Y rotation per unit of horizontal pointer offset.
    pub gain_y: f32,
    /// Per-frame smoothing factor for rotation, in `(0, 1)`.
    pub alpha: f32,
    /// Idle spin around Y in radians per second.
    pub idle_spin: f32,
    /// Idle tumble around X in radians per second.
    #[serde(default)]
    pub tumble: f32,
    pub float_amplitude: f32,
    /// Angular frequency of the vertical float, radians per second.
    pub float_frequency: f32,
    pub base_scale: f32,
    pub hover_scale: f32,
    /// Per-frame smoothing factor for scale and resting height.
    pub scale_alpha: f32,
    pub base_y: f32,
}

impl MotionProfile {
    /// Full-size asset framing.
    pub const MODEL: Self = Self {
        gain_x: 0.3,
        gain_y: 0.5,
        alpha: 0.05,
        idle_spin: 0.3,
        tumble: 0.0,
        float_amplitude: 0.1,
        float_frequency: 2.0,
        base_scale: 2.0,
        hover_scale: 2.2,
        scale_alpha: 0.1,
        base_y: -1.0,
    };

    /// Slower, subtler motion for the placeholder geometry.
    pub const PROCEDURAL: Self = Self {
        gain_x: 0.2,
        gain_y: 0.3,
        alpha: 0.02,
        idle_spin: 0.3,
        tumble: 0.0,
        float_amplitude: 0.1,
        float_frequency: 2.0,
        base_scale: 1.0,
        hover_scale: 1.2,
        scale_alpha: 0.05,
        base_y: 0.0,
    };

    /// The loading cube ignores the pointer and tumbles about X and Y.
    pub const LOADING: Self = Self {
        gain_x: 0.0,
        gain_y: 0.0,
        alpha: 0.05,
        idle_spin: 0.3,
        tumble: 0.5,
        float_amplitude: 0.0,
        float_frequency: 0.0,
        base_scale: 1.0,
        hover_scale: 1.0,
        scale_alpha: 0.05,
        base_y: 0.0,
    };

    /// 2D card: 15 degree tilt range, 10 degrees per second spin.
    pub const FLAT: Self = Self {
        gain_x: 0.261_799_4,
        gain_y: 0.261_799_4,
        alpha: 0.25,
        idle_spin: 0.174_532_9,
        tumble: 0.0,
        float_amplitude: 0.05,
        float_frequency: 1.0,
        base_scale: 1.0,
        hover_scale: 1.1,
        scale_alpha: 0.25,
        base_y: 0.0,
    };

    /// Clamps smoothing factors into `(0, 1)` and rejects non-finite values.
    pub fn sanitized(mut self) -> Self {
        let clamp_alpha = |value: f32, fallback: f32| {
            if value.is_finite() {
                value.clamp(1e-4, 0.9999)
            } else {
                fallback
            }
        };
        self.alpha = clamp_alpha(self.alpha, 0.05);
        self.scale_alpha = clamp_alpha(self.scale_alpha, 0.1);
        for value in [
            &mut self.gain_x,
            &mut self.gain_y,
            &mut self.idle_spin,
            &mut self.tumble,
            &mut self.float_amplitude,
            &mut self.float_frequency,
            &mut self.base_y,
        ] {
            if !value.is_finite() {
                *value = 0.0;
            }
        }
        for value in [&mut self.base_scale, &mut self.hover_scale] {
            if !value.is_finite() || *value <= 0.0 {
                *value = 1.0;
            }
        }
        self
    }
}

/// Motion profiles for every tier that animates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionProfiles {
    pub model: MotionProfile,
    pub procedural: MotionProfile,
    pub loading: MotionProfile,
    pub flat: MotionProfile,
}

impl Default for MotionProfiles {
    fn default() -> Self {
        Self {
            model: MotionProfile::MODEL,
            procedural: MotionProfile::PROCEDURAL,
            loading: MotionProfile::LOADING,
            flat: MotionProfile::FLAT,
        }
    }
}

impl MotionProfiles {
    /// Profile driving `tier`, or `None` for the static message.
    pub fn for_tier(&self, tier: RenderTier) -> Option<&MotionProfile> {
        match tier {
            RenderTier::Model => Some(&self.model),
            RenderTier::ProceduralFallback => Some(&self.procedural),
            RenderTier::Loading => Some(&self.loading),
            RenderTier::FlatFallback => Some(&self.flat),
            RenderTier::Unsupported => None,
        }
    }

    pub fn for_tier_mut(&mut self, tier: RenderTier) -> Option<&mut MotionProfile> {
        match tier {
            RenderTier::Model => Some(&mut self.model),
            RenderTier::ProceduralFallback => Some(&mut self.procedural),
            RenderTier::Loading => Some(&mut self.loading),
            RenderTier::FlatFallback => Some(&mut self.flat),
            RenderTier::Unsupported => None,
        }
    }
}

/// Target values derived from the pointer for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransformTarget {
    pub rotation_y: f32,
    pub rotation_x: f32,
    pub scale: f32,
    pub position_y: f32,
}

impl TransformTarget {
    pub fn from_pointer(pointer: Vec2, hovered: bool, profile: &MotionProfile) -> Self {
        Self {
            rotation_y: pointer.x * profile.gain_y,
            rotation_x: pointer.y * profile.gain_x,
            scale: if hovered {
                profile.hover_scale
            } else {
                profile.base_scale
            },
            position_y: profile.base_y,
        }
    }
}

/// Model transform carried from one frame to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub rotation_y: f32,
    pub rotation_x: f32,
    /// Accumulated idle spin, kept apart from the pointer-driven rotation.
    pub spin: f32,
    pub tumble: f32,
    pub scale: f32,
    /// Smoothed resting height without the float offset.
    pub rest_y: f32,
    pub position_y: f32,
}

impl Transform {
    pub fn at_rest(profile: &MotionProfile) -> Self {
        Self {
            rotation_y: 0.0,
            rotation_x: 0.0,
            spin: 0.0,
            tumble: 0.0,
            scale: profile.base_scale,
            rest_y: profile.base_y,
            position_y: profile.base_y,
        }
    }

    /// Pointer tilt is applied around the spinning model.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, self.position_y, 0.0))
            * Mat4::from_rotation_y(self.rotation_y)
            * Mat4::from_rotation_x(self.rotation_x + self.tumble)
            * Mat4::from_rotation_y(self.spin)
            * Mat4::from_scale(Vec3::splat(self.scale))
    }
}

/// One step of `current += (target - current) * alpha`.
pub fn smooth(current: f32, target: f32, alpha: f32) -> f32 {
    current + (target - current) * alpha
}

/// Frame-to-frame animation state of the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    transform: Transform,
    elapsed: f32,
}

impl Motion {
    pub fn new(profile: &MotionProfile) -> Self {
        Self {
            transform: Transform::at_rest(profile),
            elapsed: 0.0,
        }
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Seconds of animation time since mount.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Advances the animation by `dt` seconds toward the pointer target.
    pub fn tick(&mut self, dt: f32, pointer: Vec2, hovered: bool, profile: &MotionProfile) -> &Transform {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.elapsed += dt;
        let target = TransformTarget::from_pointer(pointer, hovered, profile);
        let t = &mut self.transform;

        t.rotation_y = smooth(t.rotation_y, target.rotation_y, profile.alpha);
        t.rotation_x = smooth(t.rotation_x, target.rotation_x, profile.alpha);
        t.scale = smooth(t.scale, target.scale, profile.scale_alpha);
        t.rest_y = smooth(t.rest_y, target.position_y, profile.scale_alpha);
        t.spin = (t.spin + profile.idle_spin * dt) % std::f32::consts::TAU;
        t.tumble = (t.tumble + profile.tumble * dt) % std::f32::consts::TAU;
        t.position_y =
            t.rest_y + (self.elapsed * profile.float_frequency).sin() * profile.float_amplitude;
        &self.transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f32 = 1.0 / 60.0;

    #[test]
    fn smoothing_is_contractive_without_overshoot() {
        for alpha in [0.02, 0.05, 0.1, 0.5, 0.95] {
            let target = 1.3;
            let mut current = -0.7_f32;
            let mut gap = (target - current).abs();
            while gap > 1e-4 {
                current = smooth(current, target, alpha);
                let next_gap = (target - current).abs();
                assert!(next_gap < gap, "alpha {alpha}: {next_gap} >= {gap}");
                assert!(current <= target, "alpha {alpha} overshot");
                gap = next_gap;
            }
        }
    }

    #[test]
    fn each_frame_moves_at_most_one_step() {
        let profile = MotionProfile::MODEL;
        let mut motion = Motion::new(&profile);
        let mut hovered = false;
        for frame in 0..240 {
            if frame % 7 == 0 {
                hovered = !hovered;
            }
            let pointer = Vec2::new((frame as f32 * 0.37).sin(), (frame as f32 * 0.11).cos());
            let before = *motion.transform();
            let target = TransformTarget::from_pointer(pointer, hovered, &profile);
            let after = *motion.tick(FRAME, pointer, hovered, &profile);
            let max_rot = (target.rotation_y - before.rotation_y).abs() * profile.alpha;
            assert!((after.rotation_y - before.rotation_y).abs() <= max_rot + 1e-6);
            let max_scale = (target.scale - before.scale).abs() * profile.scale_alpha;
            assert!((after.scale - before.scale).abs() <= max_scale + 1e-6);
        }
    }

    #[test]
    fn centred_pointer_leaves_only_idle_motion() {
        let profile = MotionProfile::PROCEDURAL;
        let mut motion = Motion::new(&profile);
        for _ in 0..120 {
            motion.tick(FRAME, Vec2::ZERO, false, &profile);
        }
        let t = motion.transform();
        assert_eq!(t.rotation_x, 0.0);
        assert_eq!(t.rotation_y, 0.0);
        assert!((t.spin - 0.3 * 2.0).abs() < 1e-3);
    }

    #[test]
    fn loading_cube_tumbles_about_both_axes() {
        let profile = MotionProfile::LOADING;
        let mut motion = Motion::new(&profile);
        for _ in 0..120 {
            motion.tick(FRAME, Vec2::new(1.0, 1.0), true, &profile);
        }
        let t = motion.transform();
        assert!((t.tumble - 0.5 * 2.0).abs() < 1e-3);
        assert!((t.spin - 0.3 * 2.0).abs() < 1e-3);
        assert_eq!(t.rotation_x, 0.0);
        assert_eq!(t.rotation_y, 0.0);
    }

    #[test]
    fn hover_scales_toward_hover_scale() {
        let profile = MotionProfile::MODEL;
        let mut motion = Motion::new(&profile);
        for _ in 0..200 {
            motion.tick(FRAME, Vec2::ZERO, true, &profile);
        }
        assert!((motion.transform().scale - profile.hover_scale).abs() < 1e-3);
    }

    #[test]
    fn float_stays_within_amplitude() {
        let profile = MotionProfile::MODEL;
        let mut motion = Motion::new(&profile);
        for _ in 0..600 {
            let t = motion.tick(FRAME, Vec2::ZERO, false, &profile);
            assert!((t.position_y - profile.base_y).abs() <= profile.float_amplitude + 1e-5);
        }
    }

    #[test]
    fn sanitize_clamps_alpha_and_scale() {
        let mut profile = MotionProfile::MODEL;
        profile.alpha = 3.0;
        profile.scale_alpha = f32::NAN;
        profile.hover_scale = -1.0;
        let clean = profile.sanitized();
        assert!(clean.alpha < 1.0 && clean.alpha > 0.0);
        assert_eq!(clean.scale_alpha, 0.1);
        assert_eq!(clean.hover_scale, 1.0);
    }

    #[test]
    fn unsupported_tier_has_no_profile() {
        let profiles = MotionProfiles::default();
        assert!(profiles.for_tier(RenderTier::Unsupported).is_none());
        assert_eq!(profiles.for_tier(RenderTier::Model), Some(&MotionProfile::MODEL));
    }
}
