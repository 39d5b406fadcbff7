//! BlazeFace face detection using ONNX Runtime via `ort`.
//!
//! Full-range variant (faces up to about 5 m): whole frame stretched to
//! 192×192, 2304 anchors, boxes returned relative to the frame.
use std::path::Path;

use crate::detection::domain::models::FaceDetectionModel;
use crate::shared::frame::Frame;
use crate::shared::geometry::NormalizedBox;

use super::anchors::generate_anchors;
use super::math::{nms, sigmoid};
use super::session::{ModelSession, OutputTensor, TensorLayout};
use super::tensor::{resize_to_tensor, PixelRange};

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 192;

/// `(stride, anchors_per_cell)` for the full-range model.
const ANCHOR_LAYERS: [(usize, usize); 1] = [(4, 1)];

/// Values per regressor row: box (4) + 6 keypoints (12).
const REGRESSOR_VALUES: usize = 16;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

pub struct OnnxBlazefaceModel {
    session: ModelSession,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceModel {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ModelSession::open(model_path, TensorLayout::Nhwc, INPUT_SIZE)?;
        let anchors = generate_anchors(session.input_width(), &ANCHOR_LAYERS);
        Ok(Self {
            session,
            confidence,
            anchors,
        })
    }
}

impl FaceDetectionModel for OnnxBlazefaceModel {
    fn process(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<NormalizedBox>, Box<dyn std::error::Error>> {
        let input = resize_to_tensor(
            frame,
            self.session.input_width(),
            self.session.input_height(),
            self.session.layout(),
            PixelRange::Signed,
        );
        let outputs = self.session.run(input)?;
        let (regressors, scores) = split_outputs(&outputs)?;

        Ok(decode_faces(
            &regressors.data,
            &scores.data,
            &self.anchors,
            self.session.input_width() as f32,
            self.confidence,
        ))
    }
}

/// BlazeFace emits regressors `[1, N, 16]` and scores `[1, N, 1]`; export
/// tools disagree on their order, so tell them apart by row width.
fn split_outputs(
    outputs: &[OutputTensor],
) -> Result<(&OutputTensor, &OutputTensor), Box<dyn std::error::Error>> {
    let regressors = outputs
        .iter()
        .find(|o| o.last_dim() == REGRESSOR_VALUES)
        .ok_or("BlazeFace model has no [1, N, 16] regressor output")?;
    let scores = outputs
        .iter()
        .find(|o| o.last_dim() == 1)
        .ok_or("BlazeFace model has no [1, N, 1] score output")?;
    Ok((regressors, scores))
}

fn decode_faces(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    input_size: f32,
    confidence: f64,
) -> Vec<NormalizedBox> {
    let mut boxes = Vec::new();
    let mut box_scores = Vec::new();

    for (i, &raw_score) in score_data.iter().enumerate().take(anchors.len()) {
        let score = sigmoid(raw_score) as f64;
        if score < confidence {
            continue;
        }
        let offset = i * REGRESSOR_VALUES;
        if offset + 4 > reg_data.len() {
            break;
        }

        let anchor = anchors[i];
        let cx = anchor[0] + reg_data[offset] / input_size;
        let cy = anchor[1] + reg_data[offset + 1] / input_size;
        let w = reg_data[offset + 2] / input_size;
        let h = reg_data[offset + 3] / input_size;

        boxes.push([
            (cx - w / 2.0) as f64,
            (cy - h / 2.0) as f64,
            (cx + w / 2.0) as f64,
            (cy + h / 2.0) as f64,
        ]);
        box_scores.push(score);
    }

    nms(&boxes, &box_scores, NMS_IOU_THRESH)
        .into_iter()
        .map(|i| {
            let [x1, y1, x2, y2] = boxes[i];
            NormalizedBox::new(x1, y1, x2 - x1, y2 - y1)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn anchors() -> Vec<[f32; 2]> {
        generate_anchors(INPUT_SIZE, &ANCHOR_LAYERS)
    }

    fn empty_outputs() -> (Vec<f32>, Vec<f32>) {
        (vec![0.0; 2304 * REGRESSOR_VALUES], vec![-10.0; 2304])
    }

    #[test]
    fn test_no_confident_anchor_gives_no_faces() {
        let (reg, scores) = empty_outputs();
        assert!(decode_faces(&reg, &scores, &anchors(), 192.0, 0.5).is_empty());
    }

    #[test]
    fn test_full_range_anchor_grid() {
        let anchors = anchors();
        assert_eq!(anchors.len(), 2304);
        assert_eq!(anchors[0], [0.5 / 48.0, 0.5 / 48.0]);
        assert_ne!(anchors[0], anchors[1]);
    }

    #[test]
    fn test_decodes_box_relative_to_anchor() {
        let anchors = anchors();
        let (mut reg, mut scores) = empty_outputs();
        // Anchor 0 is centered at (1/96, 1/96); move it to (0.5, 0.25), size 0.25x0.125
        scores[0] = 5.0;
        reg[0] = (0.5 - anchors[0][0]) * 192.0;
        reg[1] = (0.25 - anchors[0][1]) * 192.0;
        reg[2] = 48.0;
        reg[3] = 24.0;

        let faces = decode_faces(&reg, &scores, &anchors, 192.0, 0.5);
        assert_eq!(faces.len(), 1);
        assert_relative_eq!(faces[0].xmin, 0.375, epsilon = 1e-5);
        assert_relative_eq!(faces[0].ymin, 0.1875, epsilon = 1e-5);
        assert_relative_eq!(faces[0].width, 0.25, epsilon = 1e-5);
        assert_relative_eq!(faces[0].height, 0.125, epsilon = 1e-5);
    }

    #[test]
    fn test_overlapping_detections_merged() {
        let anchors = anchors();
        let (mut reg, mut scores) = empty_outputs();
        // Neighbouring cells 0 and 1 are 4px apart; same 30px box, different scores
        for i in 0..2 {
            scores[i] = 3.0 + i as f32;
            reg[i * REGRESSOR_VALUES + 2] = 30.0;
            reg[i * REGRESSOR_VALUES + 3] = 30.0;
        }
        assert_eq!(decode_faces(&reg, &scores, &anchors, 192.0, 0.5).len(), 1);
    }

    #[test]
    fn test_split_outputs_by_row_width() {
        let outputs = vec![
            OutputTensor {
                shape: vec![1, 2304, 1],
                data: vec![0.0; 2304],
            },
            OutputTensor {
                shape: vec![1, 2304, 16],
                data: vec![0.0; 2304 * 16],
            },
        ];
        let (reg, scores) = split_outputs(&outputs).unwrap();
        assert_eq!(reg.last_dim(), 16);
        assert_eq!(scores.last_dim(), 1);
    }

    #[test]
    fn test_split_outputs_rejects_unknown_model() {
        let outputs = vec![OutputTensor {
            shape: vec![1, 10],
            data: vec![0.0; 10],
        }];
        assert!(split_outputs(&outputs).is_err());
    }
}
