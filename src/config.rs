use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::target::SearchTarget;
use crate::ticker::DEFAULT_TICK_INTERVAL;
use crate::tracking::{SmoothingParams, DEFAULT_RETENTION, DEFAULT_SMOOTHING_WEIGHT};

/// Minimum confidence a detection source should let through.
pub const DEFAULT_CONFIDENCE_FLOOR: f32 = 0.35;

#[derive(Debug, Deserialize, Default)]
struct TrackerConfigFile {
    tracking: Option<TrackingConfigFile>,
    source: Option<SourceConfigFile>,
    targets: Option<Vec<SearchTarget>>,
}

#[derive(Debug, Deserialize, Default)]
struct TrackingConfigFile {
    retention_ms: Option<u64>,
    tick_ms: Option<u64>,
    smoothing_weight: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    confidence_floor: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub retention: Duration,
    pub tick_interval: Duration,
    pub smoothing_weight: f32,
    pub confidence_floor: f32,
    pub targets: Vec<SearchTarget>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            tick_interval: DEFAULT_TICK_INTERVAL,
            smoothing_weight: DEFAULT_SMOOTHING_WEIGHT,
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
            targets: Vec::new(),
        }
    }
}

impl TrackerConfig {
    /// Load from `ACCIO_CONFIG` (if set), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ACCIO_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit path, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: TrackerConfigFile) -> Self {
        let defaults = Self::default();
        let tracking = file.tracking.unwrap_or_default();
        Self {
            retention: tracking
                .retention_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retention),
            tick_interval: tracking
                .tick_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            smoothing_weight: tracking
                .smoothing_weight
                .unwrap_or(defaults.smoothing_weight),
            confidence_floor: file
                .source
                .and_then(|source| source.confidence_floor)
                .unwrap_or(defaults.confidence_floor),
            targets: file.targets.unwrap_or_default(),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(retention) = std::env::var("ACCIO_RETENTION_MS") {
            let ms: u64 = retention
                .trim()
                .parse()
                .map_err(|_| anyhow!("ACCIO_RETENTION_MS must be an integer number of milliseconds"))?;
            self.retention = Duration::from_millis(ms);
        }
        if let Ok(tick) = std::env::var("ACCIO_TICK_MS") {
            let ms: u64 = tick
                .trim()
                .parse()
                .map_err(|_| anyhow!("ACCIO_TICK_MS must be an integer number of milliseconds"))?;
            self.tick_interval = Duration::from_millis(ms);
        }
        if let Ok(floor) = std::env::var("ACCIO_CONFIDENCE_FLOOR") {
            self.confidence_floor = floor
                .trim()
                .parse()
                .map_err(|_| anyhow!("ACCIO_CONFIDENCE_FLOOR must be a number"))?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.retention.is_zero() {
            return Err(anyhow!("retention must be greater than zero"));
        }
        if self.tick_interval.is_zero() {
            return Err(anyhow!("tick interval must be greater than zero"));
        }
        if !(self.smoothing_weight > 0.0 && self.smoothing_weight <= 1.0) {
            return Err(anyhow!("smoothing weight must be within (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.confidence_floor) {
            return Err(anyhow!("confidence floor must be within [0, 1]"));
        }

        let targets = std::mem::take(&mut self.targets);
        for target in targets {
            let target = target.normalized();
            if target.name.trim().is_empty() {
                return Err(anyhow!("target name must not be empty"));
            }
            if target.aliases().is_empty() {
                return Err(anyhow!("target {} has no aliases", target.name));
            }
            self.targets.push(target);
        }
        Ok(())
    }

    pub fn smoothing(&self) -> SmoothingParams {
        SmoothingParams {
            weight: self.smoothing_weight,
            retention: self.retention,
        }
    }

    /// Configured target by name, ignoring case.
    pub fn target(&self, name: &str) -> Option<&SearchTarget> {
        self.targets
            .iter()
            .find(|target| target.name.eq_ignore_ascii_case(name.trim()))
    }
}

fn read_config_file(path: &Path) -> Result<TrackerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
