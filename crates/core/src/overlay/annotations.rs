use std::sync::Arc;

use crate::detection::domain::detection_result::DetectionResult;
use crate::shared::frame::Frame;
use crate::shared::geometry::{BoundingBox, Point};

/// Everything the display step should draw for one presentation.
///
/// Passed explicitly to the renderer; a `replacement` frame is shown
/// instead of the source frame and suppresses points and boxes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overlay {
    pub points: Vec<Point>,
    pub boxes: Vec<BoundingBox>,
    pub replacement: Option<Arc<Frame>>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_points(mut self, points: Vec<Point>) -> Self {
        self.points = points;
        self
    }

    pub fn with_boxes(mut self, boxes: Vec<BoundingBox>) -> Self {
        self.boxes = boxes;
        self
    }

    pub fn with_replacement(mut self, replacement: Option<Frame>) -> Self {
        self.replacement = replacement.map(Arc::new);
        self
    }

    /// Overlay drawing every result: points and boxes accumulate, the last
    /// composite becomes the replacement.
    pub fn from_results(results: impl IntoIterator<Item = DetectionResult>) -> Self {
        let mut overlay = Self::new();
        for result in results {
            overlay.add_result(result);
        }
        overlay
    }

    pub fn add_result(&mut self, result: DetectionResult) {
        match result {
            DetectionResult::Points(points) => self.points.extend(points),
            DetectionResult::Boxes(boxes) => self.boxes.extend(boxes),
            DetectionResult::Composite(frame) => self.replacement = frame.map(Arc::new),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.boxes.is_empty() && self.replacement.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        assert!(Overlay::new().is_empty());
    }

    #[test]
    fn test_from_results_merges_points_and_boxes() {
        let overlay = Overlay::from_results([
            DetectionResult::Points(vec![Point::new(1.0, 1.0), Point::new(2.0, 2.0)]),
            DetectionResult::Boxes(vec![BoundingBox::new(0.0, 0.0, 4.0, 4.0)]),
            DetectionResult::Points(vec![Point::new(3.0, 3.0)]),
        ]);
        assert_eq!(overlay.points.len(), 3);
        assert_eq!(overlay.boxes.len(), 1);
        assert!(overlay.replacement.is_none());
    }

    #[test]
    fn test_composite_result_sets_replacement() {
        let frame = Frame::filled(2, 2, [5, 5, 5]);
        let overlay = Overlay::from_results([DetectionResult::Composite(Some(frame.clone()))]);
        assert_eq!(overlay.replacement.as_deref(), Some(&frame));

        let absent = Overlay::from_results([DetectionResult::Composite(None)]);
        assert!(absent.is_empty());
    }

    #[test]
    fn test_builders_fill_fields() {
        let overlay = Overlay::new()
            .with_points(vec![Point::new(1.0, 2.0)])
            .with_boxes(vec![BoundingBox::new(0.0, 0.0, 3.0, 3.0)])
            .with_replacement(Some(Frame::filled(2, 2, [0, 0, 0])));
        assert_eq!(overlay.points.len(), 1);
        assert_eq!(overlay.boxes.len(), 1);
        assert!(overlay.replacement.is_some());
        assert!(!overlay.is_empty());
    }

    #[test]
    fn test_absent_replacement_stays_empty() {
        assert!(Overlay::new().with_replacement(None).is_empty());
    }
}
