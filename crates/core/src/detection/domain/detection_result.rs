use crate::shared::frame::Frame;
use crate::shared::geometry::{BoundingBox, Point};

/// Output of one detector call.
///
/// Recomputed on every call; nothing is cached between frames.
#[derive(Clone, Debug, PartialEq)]
pub enum DetectionResult {
    /// Pixel-space landmarks, one `(x, y)` row each.
    Points(Vec<Point>),
    /// Pixel-space boxes, one `(x, y, width, height)` row each.
    Boxes(Vec<BoundingBox>),
    /// Background-replaced frame, absent when there was no input frame.
    Composite(Option<Frame>),
}

impl DetectionResult {
    /// Row width of the tabular form: 2 for points, 4 for boxes, 3 (RGB) for
    /// composites.
    pub fn columns(&self) -> usize {
        match self {
            DetectionResult::Points(_) => 2,
            DetectionResult::Boxes(_) => 4,
            DetectionResult::Composite(_) => 3,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DetectionResult::Points(points) => points.len(),
            DetectionResult::Boxes(boxes) => boxes.len(),
            DetectionResult::Composite(frame) => usize::from(frame.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Points as `[x, y]` rows; empty for other variants.
    pub fn point_rows(&self) -> Vec<[f64; 2]> {
        match self {
            DetectionResult::Points(points) => points.iter().map(|p| p.to_row()).collect(),
            _ => Vec::new(),
        }
    }

    /// Boxes as `[x, y, width, height]` rows; empty for other variants.
    pub fn box_rows(&self) -> Vec<[f64; 4]> {
        match self {
            DetectionResult::Boxes(boxes) => boxes.iter().map(|b| b.to_row()).collect(),
            _ => Vec::new(),
        }
    }
}
