mod common;
mod gpu;
mod headless;
mod shared;

#[cfg(target_arch = "wasm32")]
mod canvas;

pub use common::{CameraParams, Frame, FrameRenderer, LightParams, RenderError};
pub use gpu::{backends, GpuRenderer};
pub use headless::{FrameLog, FrameRecord, RecordingRenderer};

#[cfg(target_arch = "wasm32")]
pub use canvas::CardRenderer;
