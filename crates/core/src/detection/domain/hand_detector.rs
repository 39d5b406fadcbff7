use crate::shared::frame::Frame;
use crate::shared::geometry::Point;

use super::detection_result::DetectionResult;
use super::detector::Detector;
use super::models::HandLandmarkModel;

/// Hand landmarks for every detected hand, flattened into one point list.
pub struct HandDetector {
    model: Box<dyn HandLandmarkModel>,
}

impl HandDetector {
    pub fn new(model: Box<dyn HandLandmarkModel>) -> Self {
        Self { model }
    }

    pub fn points(
        &mut self,
        frame: Option<&Frame>,
    ) -> Result<Vec<Point>, Box<dyn std::error::Error>> {
        let Some(frame) = frame else {
            return Ok(Vec::new());
        };
        let (width, height) = frame.dimensions();
        let hands = self.model.process(frame)?;
        log::debug!("Frame {}: {} hand(s)", frame.index(), hands.len());
        Ok(hands
            .into_iter()
            .flatten()
            .map(|landmark| landmark.to_pixels(width, height))
            .collect())
    }
}

impl Detector for HandDetector {
    fn detect(
        &mut self,
        frame: Option<&Frame>,
    ) -> Result<DetectionResult, Box<dyn std::error::Error>> {
        self.points(frame).map(DetectionResult::Points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::geometry::NormalizedPoint;
    use std::sync::{Arc, Mutex};

    struct StubHandModel {
        hands: Vec<Vec<NormalizedPoint>>,
        calls: Arc<Mutex<usize>>,
    }

    impl HandLandmarkModel for StubHandModel {
        fn process(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<Vec<NormalizedPoint>>, Box<dyn std::error::Error>> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.hands.clone())
        }
    }

    struct FailingHandModel;

    impl HandLandmarkModel for FailingHandModel {
        fn process(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<Vec<NormalizedPoint>>, Box<dyn std::error::Error>> {
            Err("inference failed".into())
        }
    }

    fn hand(offset: f64) -> Vec<NormalizedPoint> {
        (0..21)
            .map(|i| NormalizedPoint::new(offset + i as f64 * 0.01, 0.5))
            .collect()
    }

    fn detector(hands: Vec<Vec<NormalizedPoint>>) -> (HandDetector, Arc<Mutex<usize>>) {
        let calls = Arc::new(Mutex::new(0));
        let model = StubHandModel {
            hands,
            calls: calls.clone(),
        };
        (HandDetector::new(Box::new(model)), calls)
    }

    #[test]
    fn test_absent_frame_returns_empty_points_without_calling_model() {
        let (mut detector, calls) = detector(vec![hand(0.1)]);
        let result = detector.detect(None).unwrap();
        assert_eq!(result, DetectionResult::Points(vec![]));
        assert_eq!(result.columns(), 2);
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_no_hands_gives_empty_points() {
        let (mut detector, _) = detector(vec![]);
        let frame = Frame::filled(64, 48, [0, 0, 0]);
        assert!(detector.detect(Some(&frame)).unwrap().is_empty());
    }

    #[test]
    fn test_hands_are_flattened_and_scaled() {
        let (mut detector, _) = detector(vec![hand(0.1), hand(0.5)]);
        let frame = Frame::filled(200, 100, [0, 0, 0]);
        let points = detector.points(Some(&frame)).unwrap();

        assert_eq!(points.len(), 42);
        assert!((points[0].x - 20.0).abs() < 1e-9);
        assert!((points[0].y - 50.0).abs() < 1e-9);
        assert!((points[21].x - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_points_stay_inside_frame() {
        let outside = vec![
            NormalizedPoint::new(-0.3, 1.4),
            NormalizedPoint::new(1.2, -0.1),
        ];
        let (mut detector, _) = detector(vec![outside]);
        let frame = Frame::filled(120, 80, [0, 0, 0]);
        for p in detector.points(Some(&frame)).unwrap() {
            assert!((0.0..=120.0).contains(&p.x));
            assert!((0.0..=80.0).contains(&p.y));
        }
    }

    #[test]
    fn test_model_errors_propagate() {
        let mut detector = HandDetector::new(Box::new(FailingHandModel));
        let frame = Frame::filled(8, 8, [0, 0, 0]);
        assert!(detector.detect(Some(&frame)).is_err());
        // Absent frame still never fails
        assert!(detector.detect(None).is_ok());
    }
}
