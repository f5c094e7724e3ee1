//! Asynchronous model loading with stale-result suppression.
//!
//! A load is split in two halves: [`AssetLoader::load`] hands a
//! [`LoadCompletion`] to an [`AssetFetcher`], and whatever thread or task the
//! fetcher runs on later calls [`LoadCompletion::settle`]. The parsed outcome
//! is parked in a slot until the widget picks it up between frames with
//! [`AssetLoader::take_settled`]. Each load bumps a generation counter, so a
//! completion belonging to an older URL, or to an unmounted widget, is
//! dropped on arrival.

#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;
use std::sync::{Arc, Weak};
#[cfg(not(target_arch = "wasm32"))]
use std::thread;

use log::{debug, warn};
use parking_lot::Mutex;
use thiserror::Error;

use crate::obj::{parse_obj, MeshError};
use crate::procedural::PRIMARY_COLOR;
use crate::scene::{hex_color, SceneGraph};

#[cfg(target_arch = "wasm32")]
pub mod wasm;

/// Extent of the cube loaded models are fitted into.
pub const MODEL_EXTENT: f32 = 2.0;

/// Why a model could not be turned into a scene graph.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LoadError {
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("failed to parse {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: MeshError,
    },
    #[error("unsupported model format {format:?} for {url}")]
    UnsupportedFormat { url: String, format: String },
}

/// Settled result of a load attempt.
pub type LoadOutcome = Result<Arc<SceneGraph>, LoadError>;

/// Starts fetching a URL without blocking the caller.
///
/// Implementations must call [`LoadCompletion::settle`] at most once; never
/// calling it leaves the viewport in the loading tier.
pub trait AssetFetcher {
    fn fetch(&self, url: &str, completion: LoadCompletion);
}

#[derive(Debug, Default)]
struct SettleSlot {
    generation: u64,
    active: bool,
    settled: Option<LoadOutcome>,
}

/// Handle given to a fetcher for delivering one load result.
#[derive(Debug)]
pub struct LoadCompletion {
    url: String,
    generation: u64,
    slot: Weak<Mutex<SettleSlot>>,
}

impl LoadCompletion {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Parses the fetched bytes and parks the outcome for the widget.
    ///
    /// Returns `false` when the result was discarded because the load was
    /// superseded or the widget is gone.
    pub fn settle(self, bytes: Result<Vec<u8>, LoadError>) -> bool {
        if !self.is_current() {
            debug!("discarding stale result for {}", self.url);
            return false;
        }
        let outcome = bytes.and_then(|bytes| decode_model(&self.url, &bytes).map(Arc::new));
        let Some(slot) = self.slot.upgrade() else {
            return false;
        };
        let mut slot = slot.lock();
        if !slot.active || slot.generation != self.generation {
            debug!("discarding stale result for {}", self.url);
            return false;
        }
        slot.settled = Some(outcome);
        true
    }

    /// Whether the owning loader still waits for this result.
    pub fn is_current(&self) -> bool {
        self.slot.upgrade().is_some_and(|slot| {
            let slot = slot.lock();
            slot.active && slot.generation == self.generation
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Idle,
    InFlight,
    Settled,
}

/// Owns the single in-flight load of a viewport.
pub struct AssetLoader {
    fetcher: Box<dyn AssetFetcher>,
    slot: Arc<Mutex<SettleSlot>>,
    url: Option<String>,
    progress: Progress,
}

impl AssetLoader {
    pub fn new(fetcher: Box<dyn AssetFetcher>) -> Self {
        Self {
            fetcher,
            slot: Arc::new(Mutex::new(SettleSlot {
                generation: 0,
                active: true,
                settled: None,
            })),
            url: None,
            progress: Progress::Idle,
        }
    }

    /// Starts loading `url`, superseding any earlier load.
    ///
    /// Asking again for the URL that is already loading or loaded is a
    /// no-op and returns `false`.
    pub fn load(&mut self, url: &str) -> bool {
        if self.url.as_deref() == Some(url) && self.progress != Progress::Idle {
            return false;
        }
        let generation = {
            let mut slot = self.slot.lock();
            if !slot.active {
                return false;
            }
            slot.generation += 1;
            slot.settled = None;
            slot.generation
        };
        debug!("loading model {url} (generation {generation})");
        self.url = Some(url.to_string());
        self.progress = Progress::InFlight;
        self.fetcher.fetch(
            url,
            LoadCompletion {
                url: url.to_string(),
                generation,
                slot: Arc::downgrade(&self.slot),
            },
        );
        true
    }

    /// Takes the outcome of the current load if it has settled.
    pub fn take_settled(&mut self) -> Option<LoadOutcome> {
        let outcome = self.slot.lock().settled.take()?;
        self.progress = Progress::Settled;
        if let Err(err) = &outcome {
            warn!("model load failed: {err}");
        }
        Some(outcome)
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn in_flight(&self) -> bool {
        self.progress == Progress::InFlight
    }

    /// Whether a result is parked and waiting for [`AssetLoader::take_settled`].
    pub fn is_settled(&self) -> bool {
        self.slot.lock().settled.is_some()
    }

    /// Invalidates any outstanding completion. Later loads are refused.
    pub fn cancel(&mut self) {
        let mut slot = self.slot.lock();
        slot.active = false;
        slot.generation += 1;
        slot.settled = None;
        self.progress = Progress::Idle;
    }
}

impl Drop for AssetLoader {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Lower-cased extension of the path part of `url`, ignoring query and
/// fragment.
pub fn url_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = file.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
}

/// Turns fetched bytes into a scene graph according to the URL's format.
pub fn decode_model(url: &str, bytes: &[u8]) -> Result<SceneGraph, LoadError> {
    let format = url_extension(url).unwrap_or_else(|| "obj".to_string());
    if format != "obj" || bytes.starts_with(b"glTF") {
        return Err(LoadError::UnsupportedFormat {
            url: url.to_string(),
            format,
        });
    }
    let mut graph = std::str::from_utf8(bytes)
        .map_err(MeshError::from)
        .and_then(|text| parse_obj(url, text, hex_color(PRIMARY_COLOR, 1.0)))
        .map_err(|source| LoadError::Parse {
            url: url.to_string(),
            source,
        })?;
    graph.normalize_to(MODEL_EXTENT);
    Ok(graph)
}

/// Reads models from the local filesystem on a worker thread.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Default)]
pub struct FileFetcher;

#[cfg(not(target_arch = "wasm32"))]
impl AssetFetcher for FileFetcher {
    fn fetch(&self, url: &str, completion: LoadCompletion) {
        let path = url.strip_prefix("file://").unwrap_or(url).to_string();
        let spawned = thread::Builder::new()
            .name("model-loader".into())
            .spawn(move || {
                let bytes = read_model(Path::new(&path)).map_err(|reason| LoadError::Fetch {
                    url: completion.url().to_string(),
                    reason,
                });
                completion.settle(bytes);
            });
        if let Err(err) = spawned {
            warn!("could not spawn model loader thread: {err}");
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn read_model(path: &Path) -> Result<Vec<u8>, String> {
    std::fs::read(path).map_err(|err| format!("{}: {err}", path.display()))
}

/// Fetcher that keeps completions so callers decide when, and whether, each
/// load settles. Used by tests and by headless runs that simulate a stalled
/// network.
#[derive(Debug, Clone, Default)]
pub struct ManualFetcher {
    pending: Arc<Mutex<Vec<LoadCompletion>>>,
}

impl ManualFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Removes and returns the oldest outstanding completion.
    pub fn take_oldest(&self) -> Option<LoadCompletion> {
        let mut pending = self.pending.lock();
        (!pending.is_empty()).then(|| pending.remove(0))
    }

    /// Removes and returns the newest outstanding completion.
    pub fn take_newest(&self) -> Option<LoadCompletion> {
        self.pending.lock().pop()
    }
}

impl AssetFetcher for ManualFetcher {
    fn fetch(&self, _url: &str, completion: LoadCompletion) {
        self.pending.lock().push(completion);
    }
}
