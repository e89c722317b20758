//! Scan session: the host-facing surface of the tracker.
//!
//! A `ScanSession` owns the tracking state for one scan and exposes four operations:
//! `start_session`, `ingest`, `tick` and `stop_session`. All of them run under one mutex,
//! so inference results and ticker prunes are applied strictly one after another.
//!
//! Every change to the output list produces an [`Emission`], which is both returned to the
//! caller and handed to the optional sink. The sink runs while the session lock is held so
//! emissions arrive in the order the state changed. It must not call back into the session.

use std::sync::mpsc::{self, Receiver};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::detect::RawDetection;
use crate::target::SearchTarget;
use crate::tracking::{MatchNotifier, MatchState, SmoothingParams, TrackedDetection, TrackingState};

/// Snapshot delivered to the presentation layer after each state change.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Emission {
    /// Every tracked label, ordered by tracking key.
    pub detections: Vec<TrackedDetection>,
    /// Subset of `detections` whose label matches the active target.
    pub matches: Vec<TrackedDetection>,
    pub has_match: bool,
    /// Set only on the emission where the target went from absent to present.
    pub found: bool,
}

pub type EmissionSink = Box<dyn FnMut(&Emission) + Send>;

struct ActiveScan {
    target: SearchTarget,
    tracking: TrackingState,
    notifier: MatchNotifier,
}

impl ActiveScan {
    fn emission(&mut self, detections: Vec<TrackedDetection>) -> Emission {
        let matches: Vec<TrackedDetection> = detections
            .iter()
            .filter(|d| self.target.matches(&d.label))
            .cloned()
            .collect();
        let has_match = !matches.is_empty();
        let found = self.notifier.observe(has_match);
        if found {
            log::info!(
                "target {} found ({} matching labels)",
                self.target.name,
                matches.len()
            );
        }
        Emission {
            detections,
            matches,
            has_match,
            found,
        }
    }
}

struct Inner {
    active: Option<ActiveScan>,
    sink: Option<EmissionSink>,
}

impl Inner {
    fn deliver(&mut self, emission: Emission) -> Emission {
        if let Some(sink) = self.sink.as_mut() {
            sink(&emission);
        }
        emission
    }
}

pub struct ScanSession {
    params: SmoothingParams,
    inner: Mutex<Inner>,
}

impl ScanSession {
    pub fn new(params: SmoothingParams) -> Self {
        Self::build(params, None)
    }

    /// Session that hands every emission to `sink`.
    pub fn with_sink(params: SmoothingParams, sink: impl FnMut(&Emission) + Send + 'static) -> Self {
        Self::build(params, Some(Box::new(sink)))
    }

    fn build(params: SmoothingParams, sink: Option<EmissionSink>) -> Self {
        Self {
            params,
            inner: Mutex::new(Inner { active: None, sink }),
        }
    }

    /// Session that forwards every emission into a channel.
    ///
    /// The receiver may live on whichever thread the presentation layer runs on.
    pub fn with_channel(params: SmoothingParams) -> (Self, Receiver<Emission>) {
        let (tx, rx) = mpsc::channel();
        let session = Self::with_sink(params, move |emission: &Emission| {
            if tx.send(emission.clone()).is_err() {
                log::debug!("emission receiver dropped");
            }
        });
        (session, rx)
    }

    pub fn params(&self) -> SmoothingParams {
        self.params
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("scan session lock poisoned"))
    }

    /// Begin scanning for `target`. Any previous session state is discarded.
    pub fn start_session(&self, target: SearchTarget) -> Result<()> {
        let mut inner = self.lock()?;
        if let Some(previous) = inner.active.as_ref() {
            log::info!("restarting scan (was searching for {})", previous.target.name);
        }
        log::info!(
            "scan started: target={} aliases={:?} retention={}ms",
            target.name,
            target.aliases(),
            self.params.retention.as_millis()
        );
        inner.active = Some(ActiveScan {
            target,
            tracking: TrackingState::new(self.params),
            notifier: MatchNotifier::new(),
        });
        Ok(())
    }

    /// Fold one batch of detections into the session.
    ///
    /// Always emits while a session is active, even for an empty batch.
    /// Returns `None` when no session is active.
    pub fn ingest(&self, detections: &[RawDetection], now: Instant) -> Result<Option<Emission>> {
        let mut inner = self.lock()?;
        let Some(active) = inner.active.as_mut() else {
            log::warn!(
                "ignoring {} detections delivered after scan stopped",
                detections.len()
            );
            return Ok(None);
        };
        let output = active.tracking.ingest(detections, now);
        log::debug!(
            "ingested {} detections, tracking {} labels",
            detections.len(),
            output.len()
        );
        let emission = active.emission(output);
        Ok(Some(inner.deliver(emission)))
    }

    /// Periodic maintenance: prune stale entries.
    ///
    /// Emits only when something was pruned.
    pub fn tick(&self, now: Instant) -> Result<Option<Emission>> {
        let mut inner = self.lock()?;
        let Some(active) = inner.active.as_mut() else {
            log::debug!("tick ignored: no active scan");
            return Ok(None);
        };
        let Some(output) = active.tracking.prune(now) else {
            return Ok(None);
        };
        let emission = active.emission(output);
        Ok(Some(inner.deliver(emission)))
    }

    /// Tear the session down. Later `ingest`/`tick` calls are ignored until the next start.
    pub fn stop_session(&self) -> Result<()> {
        let mut inner = self.lock()?;
        if let Some(active) = inner.active.take() {
            log::info!(
                "scan stopped: target={} ({} labels discarded)",
                active.target.name,
                active.tracking.len()
            );
        }
        Ok(())
    }

    pub fn is_active(&self) -> Result<bool> {
        Ok(self.lock()?.active.is_some())
    }

    /// Current match state, or `None` when no session is active.
    pub fn match_state(&self) -> Result<Option<MatchState>> {
        Ok(self.lock()?.active.as_ref().map(|a| a.notifier.state()))
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new(SmoothingParams::default())
    }
}
