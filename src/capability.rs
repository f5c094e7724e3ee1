//! Detection of a hardware-accelerated drawing context.

#[cfg(not(target_arch = "wasm32"))]
use std::panic::{self, AssertUnwindSafe};

#[cfg(not(target_arch = "wasm32"))]
use log::{info, warn};

#[cfg(target_arch = "wasm32")]
pub mod wasm;

/// Answers whether accelerated rendering is available on this host.
///
/// Implementations swallow every error and report `false` instead. Any
/// scratch surface created for the check must be released before returning
/// or when the prober is dropped.
pub trait CapabilityProbe {
    fn probe(&mut self) -> bool;
}

/// Prober with a predetermined answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedProbe(pub bool);

impl CapabilityProbe for FixedProbe {
    fn probe(&mut self) -> bool {
        self.0
    }
}

/// Probes by asking wgpu for a hardware adapter and device.
///
/// Software rasterizers are reported as unavailable so the viewport keeps the
/// cheap flat card on machines without a GPU.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy)]
pub struct GpuProbe {
    pub backends: wgpu::Backends,
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for GpuProbe {
    fn default() -> Self {
        Self {
            backends: crate::render::backends(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl CapabilityProbe for GpuProbe {
    fn probe(&mut self) -> bool {
        let backends = self.backends;
        let default_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            pollster::block_on(request_hardware_device(backends))
        }));
        panic::set_hook(default_hook);
        match result {
            Ok(Ok(adapter)) => {
                info!("accelerated rendering available on {adapter}");
                true
            }
            Ok(Err(reason)) => {
                info!("accelerated rendering unavailable: {reason}");
                false
            }
            Err(_) => {
                warn!("graphics stack panicked while probing; assuming no acceleration");
                false
            }
        }
    }
}

/// Acquires and immediately drops a device, returning the adapter name.
#[cfg(not(target_arch = "wasm32"))]
async fn request_hardware_device(backends: wgpu::Backends) -> Result<String, String> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    });
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| "no adapter".to_string())?;
    let info = adapter.get_info();
    if info.device_type == wgpu::DeviceType::Cpu {
        return Err(format!("{} is a software rasterizer", info.name));
    }
    let (_device, _queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("capability-probe"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
            },
            None,
        )
        .await
        .map_err(|err| err.to_string())?;
    Ok(format!("{} ({:?})", info.name, info.backend))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_probe_reports_its_value() {
        assert!(FixedProbe(true).probe());
        assert!(!FixedProbe(false).probe());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn gpu_probe_asks_the_renderer_backends() {
        assert_eq!(GpuProbe::default().backends, crate::render::backends());
        assert!(crate::render::backends().contains(wgpu::Backends::GL));
    }

    #[test]
    fn probe_is_usable_as_trait_object() {
        let mut probes: Vec<Box<dyn CapabilityProbe>> =
            vec![Box::new(FixedProbe(true)), Box::new(FixedProbe(false))];
        let answers: Vec<bool> = probes.iter_mut().map(|p| p.probe()).collect();
        assert_eq!(answers, [true, false]);
    }
}
