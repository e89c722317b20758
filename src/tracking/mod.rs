//! Temporal smoothing of raw detections and match edge detection.
//!
//! - `TrackingState`: per-label confidence smoothing with time-based retention
//! - `MatchNotifier`: idle/matched state machine behind the one-shot "found" signal

mod notify;
mod state;

pub use notify::{MatchNotifier, MatchState};
pub use state::{
    tracking_key, SmoothingParams, TrackedDetection, TrackedEntry, TrackingState,
    DEFAULT_RETENTION, DEFAULT_SMOOTHING_WEIGHT,
};
