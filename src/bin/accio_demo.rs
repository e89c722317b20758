//! accio_demo - live synthetic scan
//!
//! Feeds a noisy synthetic detection stream into a scan runtime in real time,
//! with the background ticker pruning stale labels, and reports every "found" edge.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use accio_tracker::{
    DetectionSource, ScanRuntime, ScanSession, SearchTarget, SyntheticConfig, SyntheticSource,
    TrackerConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a live scan against a synthetic detection stream")]
struct Args {
    /// Duration of the run in seconds.
    #[arg(long, default_value_t = 5)]
    seconds: u64,
    /// Inference passes per second.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Comma-separated labels present in the synthetic scene.
    #[arg(long, default_value = "key,cup,remote_control")]
    labels: String,
    /// Name of a target from the config file.
    #[arg(long, env = "ACCIO_TARGET")]
    target: Option<String>,
    /// Ad-hoc target alias (repeatable). Used when --target is not given.
    #[arg(long = "alias", default_value = "keys")]
    aliases: Vec<String>,
    /// Probability that a present label is missed on a pass.
    #[arg(long, default_value_t = 0.3)]
    drop_rate: f64,
    /// Optional deterministic seed.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = TrackerConfig::load()?;
    let target = resolve_target(&cfg, args.target.as_deref(), &args.aliases)?;

    let labels: Vec<String> = args
        .labels
        .split(',')
        .map(|label| label.trim())
        .filter(|label| !label.is_empty())
        .map(|label| label.to_string())
        .collect();
    let mut source = SyntheticSource::new(SyntheticConfig {
        labels,
        fps: args.fps,
        frames: Some(args.seconds.saturating_mul(args.fps as u64)),
        drop_rate: args.drop_rate,
        confidence_floor: cfg.confidence_floor,
        seed: args.seed,
    })?;
    let frame_interval = source.frame_interval();

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_handler = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_handler.store(true, Ordering::SeqCst);
    })?;

    let (session, emissions) = ScanSession::with_channel(cfg.smoothing());
    let mut runtime = ScanRuntime::new(session, cfg.tick_interval);
    runtime.start(target.clone())?;

    let started = Instant::now();
    let mut batches = 0u64;
    let mut emitted = 0u64;
    let mut found = 0u64;

    while !interrupted.load(Ordering::SeqCst) {
        let Some(batch) = source.next_batch()? else {
            break;
        };
        runtime.ingest(&batch.detections)?;
        batches += 1;

        for emission in emissions.try_iter() {
            emitted += 1;
            if emission.found {
                found += 1;
                log::info!(
                    "found {} at {:.2}s: {}",
                    target.name,
                    started.elapsed().as_secs_f64(),
                    emission
                        .matches
                        .iter()
                        .map(|d| format!("{}({:.2})", d.label, d.confidence))
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            } else if !emission.has_match && emitted > 1 {
                log::debug!("{} out of view", target.name);
            }
        }

        std::thread::sleep(frame_interval);
    }

    // let the ticker age out whatever is still tracked
    std::thread::sleep(cfg.retention + cfg.tick_interval * 2);
    emitted += emissions.try_iter().count() as u64;
    runtime.stop()?;

    log::info!(
        "demo finished: source={} batches={} emissions={} found={} elapsed={:.2}s",
        source.name(),
        batches,
        emitted,
        found,
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn resolve_target(
    cfg: &TrackerConfig,
    name: Option<&str>,
    aliases: &[String],
) -> Result<SearchTarget> {
    if let Some(name) = name {
        return cfg
            .target(name)
            .cloned()
            .ok_or_else(|| anyhow!("target '{}' is not configured", name));
    }
    let target = SearchTarget::new("ad-hoc", "", aliases);
    if target.aliases().is_empty() {
        return Err(anyhow!("at least one non-empty --alias is required"));
    }
    Ok(target)
}
