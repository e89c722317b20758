use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::detect::{BoundingBox, RawDetection};

/// Weight given to the newest confidence sample.
pub const DEFAULT_SMOOTHING_WEIGHT: f32 = 0.7;

/// How long an entry survives without a fresh sighting.
pub const DEFAULT_RETENTION: Duration = Duration::from_millis(400);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothingParams {
    pub weight: f32,
    pub retention: Duration,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            weight: DEFAULT_SMOOTHING_WEIGHT,
            retention: DEFAULT_RETENTION,
        }
    }
}

/// Per-label smoothing state.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedEntry {
    /// Label as reported by the most recent sighting.
    pub label: String,
    /// Most recent raw box. Boxes are not smoothed.
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub last_seen: Instant,
}

/// One row of the output list handed to the presentation layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackedDetection {
    pub label: String,
    #[serde(flatten)]
    pub bbox: BoundingBox,
    pub confidence: f32,
}

impl From<&TrackedEntry> for TrackedDetection {
    fn from(entry: &TrackedEntry) -> Self {
        Self {
            label: entry.label.clone(),
            bbox: entry.bbox,
            confidence: entry.confidence,
        }
    }
}

/// Tracking key for a raw label. At most one entry exists per key.
pub fn tracking_key(label: &str) -> String {
    label.to_lowercase()
}

/// Owned map from tracking key to entry.
///
/// Both entry points take `&mut self`; callers sharing a state across threads must put it
/// behind a single lock so ingest and prune never interleave.
#[derive(Clone, Debug, Default)]
pub struct TrackingState {
    entries: BTreeMap<String, TrackedEntry>,
    params: SmoothingParams,
}

impl TrackingState {
    pub fn new(params: SmoothingParams) -> Self {
        Self {
            entries: BTreeMap::new(),
            params,
        }
    }

    pub fn params(&self) -> SmoothingParams {
        self.params
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&TrackedEntry> {
        self.entries.get(&tracking_key(label))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Fold one inference pass into the state and return the new output list.
    ///
    /// Labels absent from `detections` are left alone. Duplicate labels within a batch are
    /// applied in order, so the last one wins.
    pub fn ingest(&mut self, detections: &[RawDetection], now: Instant) -> Vec<TrackedDetection> {
        for det in detections {
            if let Some(reason) = det.rejection() {
                log::warn!("dropping detection {:?}: {:?}", det.label, reason);
                continue;
            }
            let key = tracking_key(&det.label);
            let confidence = match self.entries.get(&key) {
                Some(existing) => {
                    det.confidence * self.params.weight
                        + existing.confidence * (1.0 - self.params.weight)
                }
                None => det.confidence,
            };
            self.entries.insert(
                key,
                TrackedEntry {
                    label: det.label.clone(),
                    bbox: det.bbox,
                    confidence,
                    last_seen: now,
                },
            );
        }
        self.output()
    }

    /// Drop entries older than the retention interval.
    ///
    /// Returns the new output list when something was removed, `None` otherwise.
    pub fn prune(&mut self, now: Instant) -> Option<Vec<TrackedDetection>> {
        let retention = self.params.retention;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= retention);
        let removed = before - self.entries.len();
        if removed == 0 {
            return None;
        }
        log::debug!("pruned {} stale entries, {} remain", removed, self.entries.len());
        Some(self.output())
    }

    /// Current output list, ordered by tracking key.
    pub fn output(&self) -> Vec<TrackedDetection> {
        self.entries.values().map(TrackedDetection::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str, confidence: f32) -> RawDetection {
        RawDetection::new(label, BoundingBox::new(0.2, 0.2, 0.1, 0.1), confidence)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn first_sighting_is_not_smoothed() {
        let mut state = TrackingState::default();
        let out = state.ingest(&[det("cup", 0.42)], Instant::now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].confidence, 0.42);
    }

    #[test]
    fn confidence_uses_exponential_average() {
        let t0 = Instant::now();
        let mut state = TrackingState::default();
        state.ingest(&[det("phone", 0.5)], t0);
        let out = state.ingest(&[det("phone", 1.0)], t0 + ms(50));
        assert!((out[0].confidence - 0.85).abs() < 1e-6);
    }

    #[test]
    fn box_is_replaced_not_smoothed() {
        let t0 = Instant::now();
        let mut state = TrackingState::default();
        state.ingest(&[det("cup", 0.5)], t0);
        let moved = RawDetection::new("cup", BoundingBox::new(0.6, 0.6, 0.2, 0.2), 0.5);
        let out = state.ingest(&[moved], t0 + ms(30));
        assert_eq!(out[0].bbox, BoundingBox::new(0.6, 0.6, 0.2, 0.2));
    }

    #[test]
    fn labels_differing_in_case_share_an_entry() {
        let t0 = Instant::now();
        let mut state = TrackingState::default();
        state.ingest(&[det("Cup", 0.5)], t0);
        let out = state.ingest(&[det("CUP", 0.5)], t0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "CUP");
    }

    #[test]
    fn duplicate_labels_in_one_batch_last_write_wins() {
        let mut state = TrackingState::default();
        let first = RawDetection::new("book", BoundingBox::new(0.0, 0.0, 0.1, 0.1), 0.4);
        let second = RawDetection::new("book", BoundingBox::new(0.5, 0.5, 0.1, 0.1), 0.8);
        let out = state.ingest(&[first, second], Instant::now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bbox, BoundingBox::new(0.5, 0.5, 0.1, 0.1));
        assert!((out[0].confidence - (0.8 * 0.7 + 0.4 * 0.3)).abs() < 1e-6);
    }

    #[test]
    fn unseen_labels_are_left_untouched() {
        let t0 = Instant::now();
        let mut state = TrackingState::default();
        state.ingest(&[det("cup", 0.5), det("book", 0.6)], t0);
        state.ingest(&[det("cup", 0.9)], t0 + ms(100));
        let book = state.get("book").unwrap();
        assert_eq!(book.confidence, 0.6);
        assert_eq!(book.last_seen, t0);
    }

    #[test]
    fn malformed_sample_does_not_affect_others() {
        let t0 = Instant::now();
        let mut state = TrackingState::default();
        state.ingest(&[det("cup", 0.5)], t0);
        let out = state.ingest(&[det("cup", f32::NAN), det("book", 0.7)], t0 + ms(10));
        assert_eq!(out.len(), 2);
        let cup = state.get("cup").unwrap();
        assert_eq!(cup.confidence, 0.5);
        assert_eq!(cup.last_seen, t0);
    }

    #[test]
    fn empty_batch_keeps_existing_output() {
        let t0 = Instant::now();
        let mut state = TrackingState::default();
        state.ingest(&[det("cup", 0.5)], t0);
        let out = state.ingest(&[], t0 + ms(10));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn prune_boundary_is_inclusive_of_retention() {
        let t0 = Instant::now();
        let mut state = TrackingState::default();
        state.ingest(&[det("cup", 0.5)], t0);

        assert!(state.prune(t0 + DEFAULT_RETENTION).is_none());
        assert_eq!(state.len(), 1);

        let out = state.prune(t0 + DEFAULT_RETENTION + ms(1)).unwrap();
        assert!(out.is_empty());
        assert!(state.is_empty());
    }

    #[test]
    fn prune_without_stale_entries_is_a_no_op() {
        let t0 = Instant::now();
        let mut state = TrackingState::default();
        state.ingest(&[det("cup", 0.5)], t0);
        for step in 1..=4 {
            assert!(state.prune(t0 + ms(step * 50)).is_none());
        }
        assert_eq!(state.output().len(), 1);
    }

    #[test]
    fn prune_only_removes_stale_labels() {
        let t0 = Instant::now();
        let mut state = TrackingState::default();
        state.ingest(&[det("cup", 0.5)], t0);
        state.ingest(&[det("book", 0.5)], t0 + ms(300));
        let out = state.prune(t0 + ms(500)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "book");
    }

    #[test]
    fn output_is_sorted_by_key() {
        let mut state = TrackingState::default();
        let out = state.ingest(
            &[det("scissors", 0.5), det("Bottle", 0.5), det("cup", 0.5)],
            Instant::now(),
        );
        let labels: Vec<_> = out.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["Bottle", "cup", "scissors"]);
    }

    #[test]
    fn tracked_set_is_bounded_by_labels_in_window() {
        let t0 = Instant::now();
        let mut state = TrackingState::default();
        let labels = ["cup", "book", "key", "watch", "bag"];
        let mut history: Vec<(Instant, &str)> = Vec::new();
        for step in 0..40u64 {
            let now = t0 + ms(step * 70);
            let label = labels[(step as usize * 3) % labels.len()];
            state.ingest(&[det(label, 0.6)], now);
            history.push((now, label));
            state.prune(now);

            let mut in_window: Vec<&str> = history
                .iter()
                .filter(|(seen, _)| now.saturating_duration_since(*seen) <= DEFAULT_RETENTION)
                .map(|(_, label)| *label)
                .collect();
            in_window.sort_unstable();
            in_window.dedup();
            assert!(state.len() <= in_window.len());
        }
    }
}
