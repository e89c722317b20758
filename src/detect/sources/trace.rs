use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::detect::result::{apply_confidence_floor, BoundingBox, RawDetection};
use crate::detect::source::{DetectionBatch, DetectionSource};

#[derive(Clone, Debug)]
pub struct TraceConfig {
    /// Detections below this confidence are dropped before they are returned.
    pub confidence_floor: f32,
    /// Boxes in the trace use a bottom-left origin and are flipped on read.
    pub bottom_left_origin: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            confidence_floor: crate::config::DEFAULT_CONFIDENCE_FLOOR,
            bottom_left_origin: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TraceLine {
    t_ms: u64,
    #[serde(default)]
    detections: Vec<RawDetection>,
}

/// Recorded detection stream, one JSON object per line:
///
/// ```text
/// {"t_ms": 0, "detections": [{"label": "key", "x": 0.1, "y": 0.2, "width": 0.1, "height": 0.1, "confidence": 0.5}]}
/// {"t_ms": 120, "detections": []}
/// ```
///
/// Blank lines and lines starting with `#` are skipped. Timestamps must not go backwards.
pub struct TraceSource {
    reader: Box<dyn BufRead + Send>,
    cfg: TraceConfig,
    line_no: usize,
    last_at: Option<Duration>,
}

impl TraceSource {
    pub fn new(reader: impl BufRead + Send + 'static, cfg: TraceConfig) -> Self {
        Self {
            reader: Box::new(reader),
            cfg,
            line_no: 0,
            last_at: None,
        }
    }

    pub fn open(path: &Path, cfg: TraceConfig) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open trace {}", path.display()))?;
        Ok(Self::new(BufReader::new(file), cfg))
    }

    fn parse_line(&self, line: &str) -> Result<DetectionBatch> {
        let parsed: TraceLine = serde_json::from_str(line)
            .map_err(|e| anyhow!("invalid trace line {}: {}", self.line_no, e))?;
        let mut detections = parsed.detections;
        if self.cfg.bottom_left_origin {
            for det in &mut detections {
                let b = det.bbox;
                det.bbox = BoundingBox::from_bottom_left_origin(b.x, b.y, b.width, b.height);
            }
        }
        Ok(DetectionBatch {
            at: Duration::from_millis(parsed.t_ms),
            detections: apply_confidence_floor(detections, self.cfg.confidence_floor),
        })
    }
}

impl DetectionSource for TraceSource {
    fn name(&self) -> &'static str {
        "trace"
    }

    fn next_batch(&mut self) -> Result<Option<DetectionBatch>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let batch = self.parse_line(trimmed)?;
            if let Some(last) = self.last_at {
                if batch.at < last {
                    return Err(anyhow!(
                        "trace line {} goes back in time ({}ms < {}ms)",
                        self.line_no,
                        batch.at.as_millis(),
                        last.as_millis()
                    ));
                }
            }
            self.last_at = Some(batch.at);
            return Ok(Some(batch));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn source(text: &str, cfg: TraceConfig) -> TraceSource {
        TraceSource::new(Cursor::new(text.to_string()), cfg)
    }

    #[test]
    fn reads_batches_and_skips_comments() {
        let mut src = source(
            "# recorded on kitchen table\n\
             {\"t_ms\": 0, \"detections\": [{\"label\": \"cup\", \"x\": 0.1, \"y\": 0.1, \"width\": 0.2, \"height\": 0.2, \"confidence\": 0.9}]}\n\
             \n\
             {\"t_ms\": 150}\n",
            TraceConfig::default(),
        );

        let first = src.next_batch().unwrap().unwrap();
        assert_eq!(first.at, Duration::ZERO);
        assert_eq!(first.detections.len(), 1);

        let second = src.next_batch().unwrap().unwrap();
        assert_eq!(second.at, Duration::from_millis(150));
        assert!(second.detections.is_empty());

        assert!(src.next_batch().unwrap().is_none());
    }

    #[test]
    fn applies_floor_and_origin_flip() {
        let mut src = source(
            "{\"t_ms\": 0, \"detections\": [\
             {\"label\": \"cup\", \"x\": 0.1, \"y\": 0.1, \"width\": 0.2, \"height\": 0.2, \"confidence\": 0.2},\
             {\"label\": \"book\", \"x\": 0.0, \"y\": 0.0, \"width\": 0.5, \"height\": 0.25, \"confidence\": 0.6}]}\n",
            TraceConfig {
                confidence_floor: 0.35,
                bottom_left_origin: true,
            },
        );

        let batch = src.next_batch().unwrap().unwrap();
        assert_eq!(batch.detections.len(), 1);
        assert_eq!(batch.detections[0].label, "book");
        assert!((batch.detections[0].bbox.y - 0.75).abs() < 1e-6);
    }

    #[test]
    fn rejects_time_going_backwards() {
        let mut src = source("{\"t_ms\": 200}\n{\"t_ms\": 100}\n", TraceConfig::default());
        assert!(src.next_batch().unwrap().is_some());
        assert!(src.next_batch().is_err());
    }

    #[test]
    fn reports_line_number_on_bad_json() {
        let mut src = source("{\"t_ms\": 0}\nnot json\n", TraceConfig::default());
        src.next_batch().unwrap();
        let err = src.next_batch().unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
