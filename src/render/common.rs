use glam::{Mat4, Vec3};
use thiserror::Error;

use crate::config::CameraConfig;
use crate::motion::Transform;
use crate::scene::SceneGraph;
use crate::tier::RenderTier;

/// Everything a renderer needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub tier: RenderTier,
    pub transform: &'a Transform,
    /// Geometry for the accelerated tiers; `None` for the flat card and the
    /// static message.
    pub scene: Option<&'a SceneGraph>,
    /// Caption shown by the non-accelerated tiers.
    pub message: &'a str,
    pub hovered: bool,
    pub elapsed: f32,
}

/// A recoverable failure while drawing a single frame.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no renderer is attached for the {0} tier")]
    Unavailable(RenderTier),
    #[error("GPU is out of memory")]
    OutOfMemory,
    #[error("surface error: {0}")]
    Surface(String),
    #[error("canvas error: {0}")]
    Canvas(String),
}

/// Draws frames for one family of tiers.
pub trait FrameRenderer {
    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError>;

    fn resize(&mut self, _width: u32, _height: u32) {}
}

/// Camera parameters consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}

impl CameraParams {
    /// Perspective camera looking at the origin.
    pub fn looking_at_origin(camera: &CameraConfig, aspect: f32) -> Self {
        let view = Mat4::look_at_rh(camera.position, Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh(
            camera.fov.to_radians(),
            aspect.max(0.01),
            camera.near,
            camera.far,
        );
        Self {
            view_proj: projection * view,
            position: camera.position,
        }
    }
}

/// Lighting state consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct LightParams {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub ambient: f32,
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            position: Vec3::new(5.0, 10.0, 5.0),
            color: Vec3::ONE,
            intensity: 0.8,
            ambient: 0.4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_projects_to_screen_centre() {
        let camera = CameraConfig {
            position: Vec3::new(0.0, 2.0, 5.0),
            ..CameraConfig::default()
        };
        let params = CameraParams::looking_at_origin(&camera, 16.0 / 9.0);
        let clip = params.view_proj * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn degenerate_aspect_is_clamped() {
        let params = CameraParams::looking_at_origin(&CameraConfig::default(), 0.0);
        assert!(params.view_proj.is_finite());
    }
}
