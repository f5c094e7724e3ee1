//! Adaptive 3D hero viewport for the CodeWeave landing page.
//!
//! The widget draws an interactive model that follows the pointer, and
//! degrades through a chain of cheaper presentations when the host cannot
//! render in 3D, the model cannot be loaded, or rendering fails at runtime.
//! Platform shells (a winit window natively, a DOM container in the browser)
//! own the widget and feed it pointer events and refresh callbacks; the
//! widget itself stays free of platform code so it can be driven headless.

pub mod app;
pub mod asset;
pub mod capability;
pub mod config;
pub mod motion;
pub mod obj;
pub mod pointer;
pub mod procedural;
pub mod render;
pub mod scene;
pub mod tier;
pub mod viewport;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use asset::{AssetFetcher, AssetLoader, LoadCompletion, LoadError, ManualFetcher};
#[cfg(not(target_arch = "wasm32"))]
pub use asset::FileFetcher;
pub use capability::{CapabilityProbe, FixedProbe};
#[cfg(not(target_arch = "wasm32"))]
pub use capability::GpuProbe;
pub use config::{CameraConfig, ConfigError, ViewportConfig};
pub use motion::{MotionProfile, MotionProfiles, Transform};
pub use obj::{parse_obj, MeshError};
pub use pointer::{BoundingBox, PointerTracker};
pub use render::{Frame, FrameRenderer, GpuRenderer, RecordingRenderer, RenderError};
pub use scene::{Mesh, MeshNode, SceneGraph};
pub use tier::{select, LoadState, RenderTier, TierMachine};
pub use viewport::{Viewport, ViewportState};
