//! accio_replay - replay a recorded detection trace
//!
//! Reads a JSON-lines trace, runs it through a scan session on a virtual clock and
//! prints every emission as one JSON object per line on stdout.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

use accio_tracker::{
    replay, Emission, ScanSession, SearchTarget, TraceConfig, TraceSource, TrackerConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a detection trace through the tracker")]
struct Args {
    /// JSON-lines trace file.
    trace: PathBuf,
    /// Config file (overrides ACCIO_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Name of a target from the config file.
    #[arg(long, env = "ACCIO_TARGET")]
    target: Option<String>,
    /// Ad-hoc target alias (repeatable). Used when --target is not given.
    #[arg(long = "alias")]
    aliases: Vec<String>,
    /// Trace boxes use a bottom-left origin.
    #[arg(long)]
    bottom_left_origin: bool,
    /// Print only emissions where the match state changed.
    #[arg(long)]
    edges_only: bool,
}

#[derive(Serialize)]
struct ReplayLine<'a> {
    t_ms: u128,
    #[serde(flatten)]
    emission: &'a Emission,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => TrackerConfig::load_from(path)?,
        None => TrackerConfig::load()?,
    };

    let target = match args.target.as_deref() {
        Some(name) => cfg
            .target(name)
            .cloned()
            .ok_or_else(|| anyhow!("target '{}' is not configured", name))?,
        None => SearchTarget::new("ad-hoc", "", &args.aliases),
    };
    if target.aliases().is_empty() {
        return Err(anyhow!("no target: pass --target NAME or at least one --alias"));
    }

    let mut source = TraceSource::open(
        &args.trace,
        TraceConfig {
            confidence_floor: cfg.confidence_floor,
            bottom_left_origin: args.bottom_left_origin,
        },
    )?;

    let session = ScanSession::new(cfg.smoothing());
    session.start_session(target)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut last_has_match = false;
    let stats = replay(&mut source, &session, cfg.tick_interval, |at, emission| {
        let changed = emission.has_match != last_has_match;
        last_has_match = emission.has_match;
        if args.edges_only && !changed {
            return Ok(());
        }
        let line = ReplayLine {
            t_ms: at.as_millis(),
            emission,
        };
        serde_json::to_writer(&mut out, &line).context("failed to encode emission")?;
        writeln!(out)?;
        Ok(())
    })?;
    session.stop_session()?;
    out.flush()?;

    log::info!(
        "replay finished: batches={} ticks={} emissions={} found={}",
        stats.batches,
        stats.ticks,
        stats.emissions,
        stats.found
    );
    Ok(())
}
