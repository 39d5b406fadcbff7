//! Two-stage hand landmark model: palm detection, then landmark regression
//! on a square crop around each palm.
use std::path::Path;

use crate::detection::domain::models::HandLandmarkModel;
use crate::shared::frame::Frame;
use crate::shared::geometry::NormalizedPoint;

use super::anchors::generate_anchors;
use super::math::{as_probability, nms, sigmoid};
use super::session::{ModelSession, OutputTensor, TensorLayout};
use super::tensor::{crop_to_tensor, resize_to_tensor, PixelRange, SquareRoi};

const PALM_INPUT_SIZE: u32 = 192;
const PALM_ANCHOR_LAYERS: [(usize, usize); 2] = [(8, 2), (16, 6)];
/// Box (4) + 7 palm keypoints (14).
const PALM_REGRESSOR_VALUES: usize = 18;
const PALM_NMS_IOU_THRESH: f64 = 0.3;

const LANDMARK_INPUT_SIZE: u32 = 224;
pub const NUM_LANDMARKS: usize = 21;
/// x, y, z per landmark.
const LANDMARK_VALUES: usize = NUM_LANDMARKS * 3;
const MIN_HAND_PRESENCE: f32 = 0.5;

/// Hand crop side relative to the larger palm box side.
const ROI_SCALE: f64 = 2.6;
/// Crop center shift toward the fingers, in palm box heights.
const ROI_SHIFT_Y: f64 = -0.5;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_MAX_HANDS: usize = 4;

/// Palm box in frame pixels, `[x1, y1, x2, y2]`.
type PixelBox = [f64; 4];

pub struct OnnxHandLandmarkModel {
    palm: ModelSession,
    landmarks: ModelSession,
    anchors: Vec<[f32; 2]>,
    confidence: f64,
    max_hands: usize,
}

impl OnnxHandLandmarkModel {
    pub fn new(
        palm_model_path: &Path,
        landmark_model_path: &Path,
        confidence: f64,
        max_hands: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let palm = ModelSession::open(palm_model_path, TensorLayout::Nhwc, PALM_INPUT_SIZE)?;
        let landmarks =
            ModelSession::open(landmark_model_path, TensorLayout::Nhwc, LANDMARK_INPUT_SIZE)?;
        let anchors = generate_anchors(palm.input_width(), &PALM_ANCHOR_LAYERS);
        Ok(Self {
            palm,
            landmarks,
            anchors,
            confidence,
            max_hands,
        })
    }

    fn detect_palms(&mut self, frame: &Frame) -> Result<Vec<PixelBox>, Box<dyn std::error::Error>> {
        let input = resize_to_tensor(
            frame,
            self.palm.input_width(),
            self.palm.input_height(),
            self.palm.layout(),
            PixelRange::Unit,
        );
        let outputs = self.palm.run(input)?;
        let regressors = find_output(&outputs, PALM_REGRESSOR_VALUES, "palm regressor")?;
        let scores = find_output(&outputs, 1, "palm score")?;

        let mut palms = decode_palms(
            &regressors.data,
            &scores.data,
            &self.anchors,
            self.palm.input_width() as f32,
            self.confidence,
            frame.width(),
            frame.height(),
        );
        palms.truncate(self.max_hands);
        Ok(palms)
    }

    fn landmarks_in(
        &mut self,
        frame: &Frame,
        roi: &SquareRoi,
    ) -> Result<Option<Vec<NormalizedPoint>>, Box<dyn std::error::Error>> {
        let size = self.landmarks.input_width();
        let input = crop_to_tensor(frame, roi, size, self.landmarks.layout(), PixelRange::Unit);
        let outputs = self.landmarks.run(input)?;

        let coords = outputs
            .iter()
            .find(|o| o.data.len() == LANDMARK_VALUES)
            .ok_or("Hand landmark model has no 63-value landmark output")?;
        let presence = outputs
            .iter()
            .find(|o| o.data.len() == 1)
            .map(|o| as_probability(o.data[0]))
            .unwrap_or(1.0);
        if presence < MIN_HAND_PRESENCE {
            return Ok(None);
        }

        Ok(Some(map_landmarks(
            &coords.data,
            roi,
            size as f64,
            frame.width(),
            frame.height(),
        )))
    }
}

impl HandLandmarkModel for OnnxHandLandmarkModel {
    fn process(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<Vec<NormalizedPoint>>, Box<dyn std::error::Error>> {
        let palms = self.detect_palms(frame)?;
        let mut hands = Vec::with_capacity(palms.len());
        for palm in &palms {
            if let Some(landmarks) = self.landmarks_in(frame, &hand_roi(palm))? {
                hands.push(landmarks);
            }
        }
        Ok(hands)
    }
}

fn find_output<'a>(
    outputs: &'a [OutputTensor],
    row_width: usize,
    what: &str,
) -> Result<&'a OutputTensor, Box<dyn std::error::Error>> {
    outputs
        .iter()
        .find(|o| o.shape.len() == 3 && o.last_dim() == row_width)
        .ok_or_else(|| format!("Palm model has no {what} output of width {row_width}").into())
}

/// Decodes palm boxes in frame pixels, best first, after NMS.
fn decode_palms(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    input_size: f32,
    confidence: f64,
    frame_width: u32,
    frame_height: u32,
) -> Vec<PixelBox> {
    let (fw, fh) = (frame_width as f64, frame_height as f64);
    let mut boxes = Vec::new();
    let mut box_scores = Vec::new();

    for (i, &raw_score) in score_data.iter().enumerate().take(anchors.len()) {
        let score = sigmoid(raw_score) as f64;
        if score < confidence {
            continue;
        }
        let offset = i * PALM_REGRESSOR_VALUES;
        if offset + 4 > reg_data.len() {
            break;
        }

        let anchor = anchors[i];
        let cx = (anchor[0] + reg_data[offset] / input_size) as f64 * fw;
        let cy = (anchor[1] + reg_data[offset + 1] / input_size) as f64 * fh;
        let w = (reg_data[offset + 2] / input_size) as f64 * fw;
        let h = (reg_data[offset + 3] / input_size) as f64 * fh;

        boxes.push([cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]);
        box_scores.push(score);
    }

    nms(&boxes, &box_scores, PALM_NMS_IOU_THRESH)
        .into_iter()
        .map(|i| boxes[i])
        .collect()
}

/// Square crop covering the whole hand: the palm box enlarged and shifted
/// up toward the fingers. Hands are assumed upright.
fn hand_roi(palm: &PixelBox) -> SquareRoi {
    let w = palm[2] - palm[0];
    let h = palm[3] - palm[1];
    SquareRoi {
        center_x: palm[0] + w / 2.0,
        center_y: palm[1] + h / 2.0 + ROI_SHIFT_Y * h,
        size: w.max(h) * ROI_SCALE,
    }
}

/// Maps crop-space landmarks (`0..input_size`) back to frame-relative ones.
fn map_landmarks(
    coords: &[f32],
    roi: &SquareRoi,
    input_size: f64,
    frame_width: u32,
    frame_height: u32,
) -> Vec<NormalizedPoint> {
    let scale = roi.size / input_size;
    coords
        .chunks_exact(3)
        .take(NUM_LANDMARKS)
        .map(|xyz| {
            let x = roi.left() + xyz[0] as f64 * scale;
            let y = roi.top() + xyz[1] as f64 * scale;
            NormalizedPoint::new(x / frame_width as f64, y / frame_height as f64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn anchors() -> Vec<[f32; 2]> {
        generate_anchors(PALM_INPUT_SIZE, &PALM_ANCHOR_LAYERS)
    }

    #[test]
    fn test_palm_anchor_count() {
        assert_eq!(anchors().len(), 2016);
    }

    #[test]
    fn test_decode_palms_in_frame_pixels() {
        let anchors = anchors();
        let mut reg = vec![0.0f32; 2016 * PALM_REGRESSOR_VALUES];
        let mut scores = vec![-10.0f32; 2016];
        // Move anchor 0 to the center, 0.25 wide and 0.5 tall
        scores[0] = 4.0;
        reg[0] = (0.5 - anchors[0][0]) * 192.0;
        reg[1] = (0.5 - anchors[0][1]) * 192.0;
        reg[2] = 48.0;
        reg[3] = 96.0;

        let palms = decode_palms(&reg, &scores, &anchors, 192.0, 0.5, 400, 200);
        assert_eq!(palms.len(), 1);
        let [x1, y1, x2, y2] = palms[0];
        assert_relative_eq!(x1, 150.0, epsilon = 1e-3);
        assert_relative_eq!(x2, 250.0, epsilon = 1e-3);
        assert_relative_eq!(y1, 50.0, epsilon = 1e-3);
        assert_relative_eq!(y2, 150.0, epsilon = 1e-3);
    }

    #[test]
    fn test_decode_palms_below_confidence() {
        let reg = vec![0.0f32; 2016 * PALM_REGRESSOR_VALUES];
        let scores = vec![0.0f32; 2016]; // sigmoid(0) = 0.5 < 0.6
        assert!(decode_palms(&reg, &scores, &anchors(), 192.0, 0.6, 100, 100).is_empty());
    }

    #[test]
    fn test_hand_roi_enlarges_and_shifts_up() {
        let roi = hand_roi(&[100.0, 100.0, 140.0, 120.0]);
        assert_relative_eq!(roi.size, 40.0 * ROI_SCALE);
        assert_relative_eq!(roi.center_x, 120.0);
        assert_relative_eq!(roi.center_y, 100.0);
    }

    #[test]
    fn test_map_landmarks_back_to_frame() {
        let roi = SquareRoi {
            center_x: 100.0,
            center_y: 50.0,
            size: 112.0,
        };
        let mut coords = vec![0.0f32; LANDMARK_VALUES];
        // Landmark 0 at the crop center, landmark 1 at its top-left corner
        coords[0] = 112.0;
        coords[1] = 112.0;
        let points = map_landmarks(&coords, &roi, 224.0, 200, 100);

        assert_eq!(points.len(), NUM_LANDMARKS);
        assert_relative_eq!(points[0].x, 0.5);
        assert_relative_eq!(points[0].y, 0.5);
        assert_relative_eq!(points[1].x, 44.0 / 200.0);
        assert_relative_eq!(points[1].y, -6.0 / 100.0);
    }

    #[test]
    fn test_find_output_requires_matching_width() {
        let outputs = vec![OutputTensor {
            shape: vec![1, 2016, 1],
            data: vec![0.0; 2016],
        }];
        assert!(find_output(&outputs, 1, "palm score").is_ok());
        assert!(find_output(&outputs, PALM_REGRESSOR_VALUES, "palm regressor").is_err());
    }
}
