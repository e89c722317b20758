use serde::{Deserialize, Serialize};

/// Axis-aligned box in normalized 0..1 coordinates, top-left origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Convert a box reported with a bottom-left origin into the top-left convention.
    pub fn from_bottom_left_origin(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y: 1.0 - (y + height),
            width,
            height,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

/// One observation from a single inference pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub label: String,
    #[serde(flatten)]
    pub bbox: BoundingBox,
    pub confidence: f32,
}

impl RawDetection {
    pub fn new(label: impl Into<String>, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            label: label.into(),
            bbox,
            confidence,
        }
    }

    /// Reason this detection must be discarded, if any.
    ///
    /// A rejected sample is dropped on its own; the rest of its batch still applies.
    pub fn rejection(&self) -> Option<Rejection> {
        if self.label.trim().is_empty() {
            return Some(Rejection::EmptyLabel);
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Some(Rejection::Confidence);
        }
        if !self.bbox.is_finite() {
            return Some(Rejection::BoundingBox);
        }
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    EmptyLabel,
    Confidence,
    BoundingBox,
}

/// Drop detections below `floor`. Applied by sources, never by the tracker.
pub fn apply_confidence_floor(detections: Vec<RawDetection>, floor: f32) -> Vec<RawDetection> {
    detections
        .into_iter()
        .filter(|d| d.confidence >= floor)
        .collect()
}
