mod result;
mod source;
pub mod sources;

pub use result::{apply_confidence_floor, BoundingBox, RawDetection, Rejection};
pub use source::{DetectionBatch, DetectionSource};
pub use sources::{SyntheticConfig, SyntheticSource, TraceConfig, TraceSource};
