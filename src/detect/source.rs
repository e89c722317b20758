use std::time::Duration;

use anyhow::Result;

use crate::detect::result::RawDetection;

/// One inference pass worth of detections.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionBatch {
    /// Offset from the start of the stream at which the pass completed.
    pub at: Duration,
    pub detections: Vec<RawDetection>,
}

/// Producer of detection batches.
///
/// # Boundary
///
/// Sources stand in for the inference engine. They are expected to:
/// - Apply their own confidence floor before returning a batch
/// - Convert boxes to normalized top-left coordinates
/// - Stop returning batches once the consumer has stopped its session
///
/// An empty batch is a quiet frame, not an error.
pub trait DetectionSource: Send {
    /// Source identifier.
    fn name(&self) -> &'static str;

    /// Next batch, or `None` once the stream is exhausted.
    fn next_batch(&mut self) -> Result<Option<DetectionBatch>>;
}
