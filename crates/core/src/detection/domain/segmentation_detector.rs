use image::imageops::{self, FilterType};

use crate::shared::frame::{Frame, CHANNELS};
use crate::shared::settings::DEFAULT_SEGMENTATION_THRESHOLD;

use super::detection_result::DetectionResult;
use super::detector::Detector;
use super::models::SegmentationModel;
use super::segmentation_mask::SegmentationMask;

/// Replaces everything but the person in the frame with a fixed background.
///
/// The background is resized to each input frame's dimensions (cached while
/// the dimensions stay the same). Pixels whose mask confidence exceeds
/// `threshold` keep the source frame's color.
pub struct SegmentationDetector {
    model: Box<dyn SegmentationModel>,
    background: Frame,
    threshold: f32,
    resized: Option<Frame>,
}

impl SegmentationDetector {
    pub fn new(model: Box<dyn SegmentationModel>, background: Frame) -> Self {
        Self::with_threshold(model, background, DEFAULT_SEGMENTATION_THRESHOLD)
    }

    pub fn with_threshold(
        model: Box<dyn SegmentationModel>,
        background: Frame,
        threshold: f32,
    ) -> Self {
        Self {
            model,
            background,
            threshold,
            resized: None,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn composite(
        &mut self,
        frame: Option<&Frame>,
    ) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let Some(frame) = frame else {
            return Ok(None);
        };
        let mask = self.model.process(frame)?;
        let threshold = self.threshold;
        let background = self.background_for(frame.width(), frame.height());
        Ok(Some(composite(frame, background, &mask, threshold)))
    }

    fn background_for(&mut self, width: u32, height: u32) -> &Frame {
        let stale = self
            .resized
            .as_ref()
            .map_or(true, |bg| bg.dimensions() != (width, height));
        if stale {
            self.resized = Some(resize_frame(&self.background, width, height));
        }
        match &self.resized {
            Some(bg) => bg,
            None => &self.background,
        }
    }
}

impl Detector for SegmentationDetector {
    fn detect(
        &mut self,
        frame: Option<&Frame>,
    ) -> Result<DetectionResult, Box<dyn std::error::Error>> {
        self.composite(frame).map(DetectionResult::Composite)
    }
}

/// Foreground from `frame`, background from `background` (same dimensions).
fn composite(frame: &Frame, background: &Frame, mask: &SegmentationMask, threshold: f32) -> Frame {
    let (width, height) = frame.dimensions();
    let mut out = background.clone().with_index(frame.index());
    let src = frame.data();
    let dst = out.data_mut();

    for y in 0..height {
        for x in 0..width {
            if mask.sample(x, y, width, height) > threshold {
                let offset = (y as usize * width as usize + x as usize) * CHANNELS;
                dst[offset..offset + CHANNELS].copy_from_slice(&src[offset..offset + CHANNELS]);
            }
        }
    }
    out
}

fn resize_frame(frame: &Frame, width: u32, height: u32) -> Frame {
    if frame.dimensions() == (width, height) {
        return frame.clone();
    }
    let resized = imageops::resize(&frame.to_rgb_image(), width, height, FilterType::Triangle);
    Frame::from_rgb_image(resized, frame.index())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const FG: [u8; 3] = [200, 10, 10];
    const BG: [u8; 3] = [10, 10, 200];

    /// Returns a fixed mask regardless of the frame.
    struct StubSegmentationModel {
        mask: SegmentationMask,
    }

    impl SegmentationModel for StubSegmentationModel {
        fn process(
            &mut self,
            _frame: &Frame,
        ) -> Result<SegmentationMask, Box<dyn std::error::Error>> {
            Ok(self.mask.clone())
        }
    }

    /// 8x8, so sampling an 8x8 frame hits cells exactly.
    fn uniform_mask(value: f32) -> SegmentationMask {
        SegmentationMask::new(vec![value; 64], 8, 8).unwrap()
    }

    /// Left half foreground, right half background.
    fn split_mask() -> SegmentationMask {
        let values = (0..4)
            .flat_map(|_| [1.0, 1.0, 0.0, 0.0])
            .collect();
        SegmentationMask::new(values, 4, 4).unwrap()
    }

    fn detector(mask: SegmentationMask, background: Frame) -> SegmentationDetector {
        SegmentationDetector::new(Box::new(StubSegmentationModel { mask }), background)
    }

    #[test]
    fn test_absent_frame_gives_absent_composite() {
        let mut detector = detector(uniform_mask(1.0), Frame::filled(4, 4, BG));
        assert_eq!(detector.detect(None).unwrap(), DetectionResult::Composite(None));
    }

    #[rstest]
    #[case::smaller(16, 9)]
    #[case::larger(1000, 700)]
    #[case::same(64, 48)]
    #[case::tall(3, 200)]
    fn test_composite_matches_frame_dimensions(#[case] bg_w: u32, #[case] bg_h: u32) {
        let mut detector = detector(split_mask(), Frame::filled(bg_w, bg_h, BG));
        let frame = Frame::filled(64, 48, FG);
        let out = detector.composite(Some(&frame)).unwrap().unwrap();
        assert_eq!(out.dimensions(), (64, 48));
    }

    #[test]
    fn test_foreground_from_frame_background_elsewhere() {
        let mut detector = detector(split_mask(), Frame::filled(10, 10, BG));
        let frame = Frame::filled(40, 40, FG);
        let out = detector.composite(Some(&frame)).unwrap().unwrap();

        assert_eq!(out.pixel(2, 20), FG);
        assert_eq!(out.pixel(37, 20), BG);
    }

    #[rstest]
    #[case::below(0.05, BG)]
    #[case::at_threshold(0.1, BG)]
    #[case::above(0.11, FG)]
    fn test_threshold_is_strict(#[case] confidence: f32, #[case] expected: [u8; 3]) {
        let mut detector = detector(uniform_mask(confidence), Frame::filled(8, 8, BG));
        let frame = Frame::filled(8, 8, FG);
        let out = detector.composite(Some(&frame)).unwrap().unwrap();
        assert_eq!(out.pixel(4, 4), expected);
    }

    #[test]
    fn test_custom_threshold() {
        let model = StubSegmentationModel {
            mask: uniform_mask(0.4),
        };
        let mut detector =
            SegmentationDetector::with_threshold(Box::new(model), Frame::filled(8, 8, BG), 0.5);
        assert_eq!(detector.threshold(), 0.5);
        let out = detector.composite(Some(&Frame::filled(8, 8, FG))).unwrap().unwrap();
        assert_eq!(out.pixel(0, 0), BG);
    }

    #[test]
    fn test_resized_background_follows_frame_size_changes() {
        let mut detector = detector(uniform_mask(0.0), Frame::filled(10, 10, BG));
        let small = detector.composite(Some(&Frame::filled(20, 20, FG))).unwrap().unwrap();
        let big = detector.composite(Some(&Frame::filled(30, 10, FG))).unwrap().unwrap();
        assert_eq!(small.dimensions(), (20, 20));
        assert_eq!(big.dimensions(), (30, 10));
        assert_eq!(big.pixel(29, 9), BG);
    }

    #[test]
    fn test_composite_keeps_frame_index() {
        let mut detector = detector(uniform_mask(1.0), Frame::filled(4, 4, BG));
        let frame = Frame::filled(4, 4, FG).with_index(12);
        let out = detector.composite(Some(&frame)).unwrap().unwrap();
        assert_eq!(out.index(), 12);
    }
}
