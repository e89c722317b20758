use std::time::Duration;

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detect::result::{apply_confidence_floor, BoundingBox, RawDetection};
use crate::detect::source::{DetectionBatch, DetectionSource};

#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    /// Labels present in the simulated scene.
    pub labels: Vec<String>,
    /// Inference passes per second.
    pub fps: u32,
    /// Number of batches before the stream ends. `None` runs forever.
    pub frames: Option<u64>,
    /// Probability that a present label is missed on a given pass.
    pub drop_rate: f64,
    pub confidence_floor: f32,
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            labels: vec!["key".to_string()],
            fps: 10,
            frames: None,
            drop_rate: 0.3,
            confidence_floor: crate::config::DEFAULT_CONFIDENCE_FLOOR,
            seed: None,
        }
    }
}

/// Noisy detection stream for demos and soak runs.
///
/// Every label gets a fixed anchor box that jitters slightly each pass, a confidence that
/// wanders around 0.6, and is randomly missed according to `drop_rate`.
pub struct SyntheticSource {
    cfg: SyntheticConfig,
    rng: StdRng,
    anchors: Vec<BoundingBox>,
    frame_index: u64,
}

impl SyntheticSource {
    pub fn new(cfg: SyntheticConfig) -> Result<Self> {
        if cfg.fps == 0 {
            return Err(anyhow!("fps must be >= 1"));
        }
        if !(0.0..=1.0).contains(&cfg.drop_rate) {
            return Err(anyhow!("drop rate must be within 0..=1"));
        }
        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let anchors = cfg
            .labels
            .iter()
            .map(|_| {
                let width = rng.gen_range(0.1..0.3);
                let height = rng.gen_range(0.1..0.3);
                BoundingBox::new(
                    rng.gen_range(0.0..1.0 - width),
                    rng.gen_range(0.0..1.0 - height),
                    width,
                    height,
                )
            })
            .collect();
        Ok(Self {
            cfg,
            rng,
            anchors,
            frame_index: 0,
        })
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.cfg.fps
    }

    fn jitter(&mut self, anchor: BoundingBox) -> BoundingBox {
        let dx = self.rng.gen_range(-0.01..0.01);
        let dy = self.rng.gen_range(-0.01..0.01);
        BoundingBox::new(
            (anchor.x + dx).clamp(0.0, 1.0 - anchor.width),
            (anchor.y + dy).clamp(0.0, 1.0 - anchor.height),
            anchor.width,
            anchor.height,
        )
    }
}

impl DetectionSource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn next_batch(&mut self) -> Result<Option<DetectionBatch>> {
        if self.cfg.frames.is_some_and(|total| self.frame_index >= total) {
            return Ok(None);
        }
        let at = self.frame_interval() * self.frame_index as u32;
        self.frame_index += 1;

        let mut detections = Vec::with_capacity(self.cfg.labels.len());
        for idx in 0..self.cfg.labels.len() {
            if self.rng.gen_bool(self.cfg.drop_rate) {
                continue;
            }
            let bbox = self.jitter(self.anchors[idx]);
            let confidence: f32 = self.rng.gen_range(0.25..0.95);
            detections.push(RawDetection::new(
                self.cfg.labels[idx].clone(),
                bbox,
                confidence,
            ));
        }

        Ok(Some(DetectionBatch {
            at,
            detections: apply_confidence_floor(detections, self.cfg.confidence_floor),
        }))
    }
}
