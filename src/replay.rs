//! Deterministic replay of a recorded detection stream.
//!
//! Batches are applied on a virtual clock anchored at the moment replay starts, with a
//! tick every `tick_interval` of virtual time in between, exactly as the live ticker would
//! interleave them. After the last batch, ticking continues until everything still tracked
//! has had time to age out.

use std::time::{Duration, Instant};

use anyhow::Result;

use crate::detect::DetectionSource;
use crate::session::{Emission, ScanSession};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub batches: u64,
    pub ticks: u64,
    pub emissions: u64,
    pub found: u64,
}

/// Drive `session` from `source`. `on_emission` receives the virtual time of each emission.
///
/// The session must already be started.
pub fn replay<S>(
    source: &mut S,
    session: &ScanSession,
    tick_interval: Duration,
    mut on_emission: impl FnMut(Duration, &Emission) -> Result<()>,
) -> Result<ReplayStats>
where
    S: DetectionSource + ?Sized,
{
    let base = Instant::now();
    let mut stats = ReplayStats::default();
    let mut next_tick = tick_interval;
    let mut last_at = Duration::ZERO;

    let mut record = |stats: &mut ReplayStats, at: Duration, emission: Option<Emission>| -> Result<()> {
        if let Some(emission) = emission {
            stats.emissions += 1;
            if emission.found {
                stats.found += 1;
            }
            on_emission(at, &emission)?;
        }
        Ok(())
    };

    while let Some(batch) = source.next_batch()? {
        while !tick_interval.is_zero() && next_tick <= batch.at {
            stats.ticks += 1;
            let emission = session.tick(base + next_tick)?;
            record(&mut stats, next_tick, emission)?;
            next_tick += tick_interval;
        }
        stats.batches += 1;
        let emission = session.ingest(&batch.detections, base + batch.at)?;
        record(&mut stats, batch.at, emission)?;
        last_at = batch.at;
    }

    let drain_until = last_at + session.params().retention + tick_interval;
    while !tick_interval.is_zero() && next_tick <= drain_until {
        stats.ticks += 1;
        let emission = session.tick(base + next_tick)?;
        record(&mut stats, next_tick, emission)?;
        next_tick += tick_interval;
    }

    log::debug!(
        "replayed {} batches from {} source with {} ticks",
        stats.batches,
        source.name(),
        stats.ticks
    );
    Ok(stats)
}
