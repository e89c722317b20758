//! Periodic pruning on a background thread.
//!
//! `TickerHandle` calls [`ScanSession::tick`] at a fixed period until stopped.
//! `ScanRuntime` ties the ticker to the session lifecycle: the ticker is armed by
//! `start` and disarmed by `stop`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::detect::RawDetection;
use crate::session::{Emission, ScanSession};
use crate::target::SearchTarget;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(150);

#[derive(Debug)]
pub struct TickerHandle {
    period: Duration,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl TickerHandle {
    pub fn spawn(session: Arc<ScanSession>, period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(anyhow!("tick interval must be greater than zero"));
        }
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let join = std::thread::Builder::new()
            .name("accio-ticker".to_string())
            .spawn(move || run_ticker(&session, period, &shutdown_thread))?;
        log::debug!("ticker armed every {}ms", period.as_millis());
        Ok(Self {
            period,
            shutdown,
            join: Some(join),
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stop(mut self) -> Result<()> {
        self.shutdown_and_join()
    }

    fn shutdown_and_join(&mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.thread().unpark();
            join.join()
                .map_err(|_| anyhow!("ticker thread panicked"))?;
            log::debug!("ticker disarmed");
        }
        Ok(())
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown_and_join() {
            log::error!("ticker shutdown failed: {}", err);
        }
    }
}

fn run_ticker(session: &ScanSession, period: Duration, shutdown: &AtomicBool) {
    let mut next = Instant::now() + period;
    loop {
        // park_timeout may wake early; keep waiting until the deadline or shutdown.
        let now = Instant::now();
        if now < next {
            std::thread::park_timeout(next - now);
        }
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        let now = Instant::now();
        if now < next {
            continue;
        }
        next = now + period;
        if let Err(err) = session.tick(now) {
            log::error!("ticker stopped: {}", err);
            break;
        }
    }
}

/// Session plus its ticker.
pub struct ScanRuntime {
    session: Arc<ScanSession>,
    tick_interval: Duration,
    ticker: Option<TickerHandle>,
}

impl ScanRuntime {
    pub fn new(session: ScanSession, tick_interval: Duration) -> Self {
        Self {
            session: Arc::new(session),
            tick_interval,
            ticker: None,
        }
    }

    pub fn session(&self) -> &Arc<ScanSession> {
        &self.session
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    /// Reset session state for `target` and arm the ticker.
    pub fn start(&mut self, target: SearchTarget) -> Result<()> {
        self.session.start_session(target)?;
        if self.ticker.is_none() {
            self.ticker = Some(TickerHandle::spawn(
                self.session.clone(),
                self.tick_interval,
            )?);
        }
        Ok(())
    }

    /// Feed a batch stamped with the current time.
    pub fn ingest(&self, detections: &[RawDetection]) -> Result<Option<Emission>> {
        self.session.ingest(detections, Instant::now())
    }

    /// Disarm the ticker and discard session state.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop()?;
        }
        self.session.stop_session()
    }
}

impl Drop for ScanRuntime {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log::error!("scan runtime shutdown failed: {}", err);
        }
    }
}
