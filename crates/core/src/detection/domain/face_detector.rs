use crate::shared::frame::Frame;
use crate::shared::geometry::BoundingBox;

use super::detection_result::DetectionResult;
use super::detector::Detector;
use super::models::FaceDetectionModel;

/// Face bounding boxes in pixels, clipped to the frame.
pub struct FaceDetector {
    model: Box<dyn FaceDetectionModel>,
}

impl FaceDetector {
    pub fn new(model: Box<dyn FaceDetectionModel>) -> Self {
        Self { model }
    }

    pub fn boxes(
        &mut self,
        frame: Option<&Frame>,
    ) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        let Some(frame) = frame else {
            return Ok(Vec::new());
        };
        let (width, height) = frame.dimensions();
        let faces = self.model.process(frame)?;
        log::debug!("Frame {}: {} face(s)", frame.index(), faces.len());
        Ok(faces
            .into_iter()
            .map(|face| face.to_pixels(width, height))
            .collect())
    }
}

impl Detector for FaceDetector {
    fn detect(
        &mut self,
        frame: Option<&Frame>,
    ) -> Result<DetectionResult, Box<dyn std::error::Error>> {
        self.boxes(frame).map(DetectionResult::Boxes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::geometry::NormalizedBox;
    use approx::assert_relative_eq;
    use rstest::rstest;

    struct StubFaceModel {
        faces: Vec<NormalizedBox>,
    }

    impl FaceDetectionModel for StubFaceModel {
        fn process(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<NormalizedBox>, Box<dyn std::error::Error>> {
            Ok(self.faces.clone())
        }
    }

    fn detector(faces: Vec<NormalizedBox>) -> FaceDetector {
        FaceDetector::new(Box::new(StubFaceModel { faces }))
    }

    #[test]
    fn test_absent_frame_returns_empty_boxes() {
        let mut detector = detector(vec![NormalizedBox::new(0.1, 0.1, 0.2, 0.2)]);
        let result = detector.detect(None).unwrap();
        assert_eq!(result, DetectionResult::Boxes(vec![]));
        assert_eq!(result.columns(), 4);
    }

    #[test]
    fn test_boxes_scaled_to_pixels() {
        let mut detector = detector(vec![NormalizedBox::new(0.25, 0.5, 0.5, 0.25)]);
        let frame = Frame::filled(400, 200, [0, 0, 0]);
        let boxes = detector.boxes(Some(&frame)).unwrap();

        assert_eq!(boxes.len(), 1);
        assert_relative_eq!(boxes[0].x, 100.0);
        assert_relative_eq!(boxes[0].y, 100.0);
        assert_relative_eq!(boxes[0].width, 200.0);
        assert_relative_eq!(boxes[0].height, 50.0);
    }

    #[rstest]
    #[case::left_top(NormalizedBox::new(-0.2, -0.1, 0.5, 0.5))]
    #[case::right_bottom(NormalizedBox::new(0.8, 0.9, 0.5, 0.5))]
    #[case::larger_than_frame(NormalizedBox::new(-1.0, -1.0, 3.0, 3.0))]
    fn test_boxes_stay_inside_frame(#[case] face: NormalizedBox) {
        let mut detector = detector(vec![face]);
        let frame = Frame::filled(160, 90, [0, 0, 0]);
        for b in detector.boxes(Some(&frame)).unwrap() {
            assert!(b.x >= 0.0 && b.y >= 0.0);
            assert!(b.right() <= 160.0 + 1e-9);
            assert!(b.bottom() <= 90.0 + 1e-9);
            assert!(b.width >= 0.0 && b.height >= 0.0);
        }
    }

    #[test]
    fn test_no_faces_gives_empty_boxes() {
        let mut detector = detector(vec![]);
        let frame = Frame::filled(10, 10, [0, 0, 0]);
        let result = detector.detect(Some(&frame)).unwrap();
        assert!(result.is_empty());
        assert!(result.box_rows().is_empty());
    }
}
