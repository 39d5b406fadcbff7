//! Ports to the external model runtime.
//!
//! Each returns coordinates relative to the input frame; detectors do the
//! scaling to pixels.

use crate::shared::frame::Frame;
use crate::shared::geometry::{NormalizedBox, NormalizedPoint};

use super::segmentation_mask::SegmentationMask;

/// 21 landmarks per detected hand.
pub trait HandLandmarkModel: Send {
    fn process(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<Vec<NormalizedPoint>>, Box<dyn std::error::Error>>;
}

pub trait FaceDetectionModel: Send {
    fn process(&mut self, frame: &Frame) -> Result<Vec<NormalizedBox>, Box<dyn std::error::Error>>;
}

/// Visible keypoints per detected person.
pub trait PoseLandmarkModel: Send {
    fn process(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<Vec<NormalizedPoint>>, Box<dyn std::error::Error>>;
}

pub trait SegmentationModel: Send {
    fn process(&mut self, frame: &Frame) -> Result<SegmentationMask, Box<dyn std::error::Error>>;
}
