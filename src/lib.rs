//! Accio tracker
//!
//! Turns a noisy, per-frame stream of object detections into a stable list of
//! "currently visible" objects, and raises a one-shot signal when the object the
//! user is searching for comes into view.
//!
//! # Architecture
//!
//! 1. **Detection source** (external): batches of `RawDetection` per inference pass.
//! 2. **Target matcher**: `target::matches` decides whether a label is the search target.
//! 3. **Tracking**: `TrackingState` smooths confidence per label and retains entries for
//!    a short grace period after their last sighting.
//! 4. **Match notifier**: `MatchNotifier` fires "found" on each absent -> present edge.
//!
//! `ScanSession` wraps 2-4 behind a single lock; `ScanRuntime` adds the periodic ticker.
//!
//! # Module Structure
//!
//! - `detect`: detection types, the `DetectionSource` seam, trace and synthetic sources
//! - `target`: search targets and label matching
//! - `tracking`: smoothing state and match state machine
//! - `session`: the four host operations and emission delivery
//! - `ticker`: background prune thread and session runtime
//! - `replay`: deterministic replay of recorded detection streams on a virtual clock
//! - `config`: file + environment configuration

pub mod config;
pub mod detect;
pub mod replay;
pub mod session;
pub mod target;
pub mod ticker;
pub mod tracking;

pub use config::{TrackerConfig, DEFAULT_CONFIDENCE_FLOOR};
pub use detect::{
    BoundingBox, DetectionBatch, DetectionSource, RawDetection, SyntheticConfig, SyntheticSource,
    TraceConfig, TraceSource,
};
pub use replay::{replay, ReplayStats};
pub use session::{Emission, EmissionSink, ScanSession};
pub use target::{matches, normalize_label, SearchTarget};
pub use ticker::{ScanRuntime, TickerHandle, DEFAULT_TICK_INTERVAL};
pub use tracking::{
    MatchNotifier, MatchState, SmoothingParams, TrackedDetection, TrackedEntry, TrackingState,
    DEFAULT_RETENTION, DEFAULT_SMOOTHING_WEIGHT,
};
