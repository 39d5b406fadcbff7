use crate::shared::frame::Frame;
use crate::shared::geometry::Point;

use super::detection_result::DetectionResult;
use super::detector::Detector;
use super::models::PoseLandmarkModel;

/// Visible body keypoints of every detected person, as one point list.
pub struct PoseDetector {
    model: Box<dyn PoseLandmarkModel>,
}

impl PoseDetector {
    pub fn new(model: Box<dyn PoseLandmarkModel>) -> Self {
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
        let people = self.model.process(frame)?;
        log::debug!("Frame {}: {} person(s)", frame.index(), people.len());
        Ok(people
            .into_iter()
            .flatten()
            .map(|keypoint| keypoint.to_pixels(width, height))
            .collect())
    }
}

impl Detector for PoseDetector {
    fn detect(
        &mut self,
        frame: Option<&Frame>,
    ) -> Result<DetectionResult, Box<dyn std::error::Error>> {
        self.points(frame).map(DetectionResult::Points)
    }
}
