use std::any::Any;
use std::env;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use codeweave_viewport::app::{run_headless, HeadlessSummary};
use codeweave_viewport::{
    CapabilityProbe, FileFetcher, FixedProbe, GpuProbe, GpuRenderer, RecordingRenderer,
    Viewport, ViewportConfig,
};

const DEFAULT_FRAMES: u32 = 120;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let mut config = match &options.config {
        Some(path) => {
            let xml = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {path}"))?;
            ViewportConfig::from_xml(&xml)
                .with_context(|| format!("failed to parse config {path}"))?
        }
        None => ViewportConfig::default(),
    };
    if let Some(model) = &options.model {
        config.model_url = Some(model.clone());
    }

    if options.summary_only {
        return run_summary(&config, &options);
    }
    match run_interactive(&config, &options) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!("{err}. Falling back to --summary-only mode.");
                run_summary(&config, &options)
            } else {
                Err(err)
            }
        }
    }
}

fn run_summary(config: &ViewportConfig, options: &CliOptions) -> Result<()> {
    let mut probe = options.gpu.probe();
    let summary = run_headless(config, probe.as_mut(), Box::new(FileFetcher), options.frames);
    summary.print();
    Ok(())
}

fn run_interactive(config: &ViewportConfig, options: &CliOptions) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("CodeWeave")
            .with_inner_size(LogicalSize::new(960.0, 540.0))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let flat = RecordingRenderer::new();
    let log = flat.log();
    let mut probe = options.gpu.probe();
    let mut viewport = Viewport::mount(config, probe.as_mut(), Box::new(FileFetcher), Box::new(flat));
    if !viewport.capability_ok() {
        return Err(WindowInitError {
            message: "no accelerated rendering available".into(),
        }
        .into());
    }

    let size = window.inner_size();
    match block_on(GpuRenderer::new(
        Arc::clone(&window),
        size.width,
        size.height,
        config.camera,
    )) {
        Ok(renderer) => viewport.attach_accelerated(Box::new(renderer)),
        Err(err) => warn!("GPU renderer unavailable: {err:#}"),
    }
    viewport.resize(size.width, size.height);

    let mut app = AppState {
        viewport,
        window: Arc::clone(&window),
        last_frame: Instant::now(),
    };
    event_loop
        .run(|event, elwt| {
            elwt.set_control_flow(ControlFlow::Poll);
            if !app.process_event(event) {
                elwt.exit();
            }
        })
        .context("event loop terminated abnormally")?;

    let summary = HeadlessSummary::capture(&app.viewport, &log.lock());
    app.viewport.unmount();
    summary.print();
    Ok(())
}

struct AppState {
    viewport: Viewport,
    window: Arc<winit::window::Window>,
    last_frame: Instant,
}

impl AppState {
    /// Returns `false` once the window should close.
    fn process_event(&mut self, event: Event<()>) -> bool {
        match event {
            Event::WindowEvent { event, window_id } if window_id == self.window.id() => {
                match event {
                    WindowEvent::CloseRequested => return false,
                    WindowEvent::Resized(size) => self.viewport.resize(size.width, size.height),
                    WindowEvent::CursorEntered { .. } => self.viewport.pointer_enter(),
                    WindowEvent::CursorLeft { .. } => self.viewport.pointer_leave(),
                    WindowEvent::CursorMoved { position, .. } => {
                        self.viewport
                            .pointer_move(position.x as f32, position.y as f32);
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        let dt = now.duration_since(self.last_frame).as_secs_f32();
                        self.last_frame = now;
                        let tier = self.viewport.frame(dt);
                        if !tier.is_accelerated() {
                            let cause = self.viewport.state().last_failure;
                            eprintln!(
                                "3D view unavailable ({}); closing window",
                                cause.as_deref().unwrap_or("no accelerated renderer")
                            );
                            info!("viewport left the accelerated tiers ({tier}); closing window");
                            return false;
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => self.window.request_redraw(),
            _ => {}
        }
        true
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GpuMode {
    Auto,
    On,
    Off,
}

impl GpuMode {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "auto" => Ok(Self::Auto),
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            other => Err(anyhow!("Unknown --gpu mode: {other}. Expected auto, on or off")),
        }
    }

    fn probe(self) -> Box<dyn CapabilityProbe> {
        match self {
            Self::Auto => Box::new(GpuProbe::default()),
            Self::On => Box::new(FixedProbe(true)),
            Self::Off => Box::new(FixedProbe(false)),
        }
    }
}

struct CliOptions {
    model: Option<String>,
    config: Option<String>,
    gpu: GpuMode,
    frames: u32,
    summary_only: bool,
}

const USAGE: &str = "Usage: codeweave-viewport [model] [--config <file.xml>] \
                     [--gpu auto|on|off] [--frames N] [--summary-only]";

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut options = Self {
            model: None,
            config: None,
            gpu: GpuMode::Auto,
            frames: DEFAULT_FRAMES,
            summary_only: false,
        };
        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => options.summary_only = true,
                "--config" => {
                    options.config = Some(args.next().ok_or_else(|| anyhow!("{USAGE}"))?);
                }
                "--gpu" => {
                    let value = args.next().ok_or_else(|| anyhow!("{USAGE}"))?;
                    options.gpu = GpuMode::parse(&value)?;
                }
                "--frames" => {
                    let value = args.next().ok_or_else(|| anyhow!("{USAGE}"))?;
                    options.frames = value
                        .parse()
                        .with_context(|| format!("invalid frame count {value:?}"))?;
                }
                "--help" | "-h" => return Err(anyhow!("{USAGE}")),
                other if other.starts_with("--") => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
                other => {
                    if options.model.replace(other.to_string()).is_some() {
                        return Err(anyhow!("Only one model may be given. {USAGE}"));
                    }
                }
            }
        }
        Ok(options)
    }
}
