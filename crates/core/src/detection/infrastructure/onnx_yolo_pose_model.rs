//! YOLO pose estimation (COCO 17 keypoints) using ONNX Runtime via `ort`.
//!
//! Handles letterbox preprocessing, inference and NMS post-processing.
use std::path::Path;

use crate::detection::domain::models::PoseLandmarkModel;
use crate::shared::frame::Frame;
use crate::shared::geometry::NormalizedPoint;

use super::math::nms;
use super::session::{ModelSession, OutputTensor, TensorLayout};
use super::tensor::{letterbox_to_tensor, Letterbox};

/// Fallback input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

pub const NUM_KEYPOINTS: usize = 17;

/// Box (4) + person confidence (1) + 17 × (x, y, visibility).
const ROW_VALUES: usize = 5 + NUM_KEYPOINTS * 3;

/// Minimum keypoint visibility to report a keypoint.
const KEYPOINT_CONF_THRESH: f64 = 0.5;

pub struct OnnxYoloPoseModel {
    session: ModelSession,
    confidence: f64,
}

impl OnnxYoloPoseModel {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ModelSession::open(model_path, TensorLayout::Nchw, DEFAULT_INPUT_SIZE)?;
        Ok(Self {
            session,
            confidence,
        })
    }
}

impl PoseLandmarkModel for OnnxYoloPoseModel {
    fn process(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<Vec<NormalizedPoint>>, Box<dyn std::error::Error>> {
        let (input, letterbox) =
            letterbox_to_tensor(frame, self.session.input_width(), self.session.layout());
        let outputs = self.session.run(input)?;
        let rows = detection_rows(&outputs[0])?;
        Ok(decode_people(
            &rows,
            &letterbox,
            self.confidence,
            frame.width(),
            frame.height(),
        ))
    }
}

/// Normalizes the output to one row per candidate.
///
/// YOLO output shape is `[1, features, detections]` (transposed) or
/// `[1, detections, features]`. Handle both.
fn detection_rows(output: &OutputTensor) -> Result<Vec<Vec<f32>>, Box<dyn std::error::Error>> {
    let shape = &output.shape;
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO pose output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < ROW_VALUES {
        return Err(format!(
            "YOLO pose output rows have {num_feats} values, expected at least {ROW_VALUES}"
        )
        .into());
    }

    let data = &output.data;
    Ok((0..num_dets)
        .map(|i| {
            if transposed {
                (0..num_feats).map(|f| data[f * num_dets + i]).collect()
            } else {
                data[i * num_feats..(i + 1) * num_feats].to_vec()
            }
        })
        .collect())
}

/// Keeps confident people after NMS and returns their visible keypoints
/// relative to the original frame.
fn decode_people(
    rows: &[Vec<f32>],
    letterbox: &Letterbox,
    confidence: f64,
    frame_width: u32,
    frame_height: u32,
) -> Vec<Vec<NormalizedPoint>> {
    let candidates: Vec<&Vec<f32>> = rows
        .iter()
        .filter(|row| row[4] as f64 >= confidence)
        .collect();

    let boxes: Vec<[f64; 4]> = candidates
        .iter()
        .map(|row| {
            let (cx, cy, w, h) = (row[0] as f64, row[1] as f64, row[2] as f64, row[3] as f64);
            let (x1, y1) = letterbox.to_frame(cx - w / 2.0, cy - h / 2.0);
            let (x2, y2) = letterbox.to_frame(cx + w / 2.0, cy + h / 2.0);
            [x1, y1, x2, y2]
        })
        .collect();
    let scores: Vec<f64> = candidates.iter().map(|row| row[4] as f64).collect();

    let (fw, fh) = (frame_width as f64, frame_height as f64);
    nms(&boxes, &scores, NMS_IOU_THRESH)
        .into_iter()
        .map(|i| {
            let row = candidates[i];
            (0..NUM_KEYPOINTS)
                .filter(|k| row[5 + k * 3 + 2] as f64 >= KEYPOINT_CONF_THRESH)
                .map(|k| {
                    let (x, y) =
                        letterbox.to_frame(row[5 + k * 3] as f64, row[5 + k * 3 + 1] as f64);
                    NormalizedPoint::new(x / fw, y / fh)
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn person_row(cx: f32, cy: f32, conf: f32, kp_visibility: f32) -> Vec<f32> {
        let mut row = vec![cx, cy, 100.0, 200.0, conf];
        for k in 0..NUM_KEYPOINTS {
            row.extend_from_slice(&[cx, cy - 50.0 + k as f32, kp_visibility]);
        }
        row
    }

    fn identity() -> Letterbox {
        Letterbox {
            scale: 1.0,
            pad_x: 0,
            pad_y: 0,
        }
    }

    #[test]
    fn test_detection_rows_handles_transposed_layout() {
        // Two candidates, 56 features each, stored feature-major
        let num_dets = 2;
        let mut data = vec![0.0f32; ROW_VALUES * num_dets];
        data[4 * num_dets + 1] = 0.9; // confidence of candidate 1
        let output = OutputTensor {
            shape: vec![1, ROW_VALUES, num_dets],
            data,
        };
        let rows = detection_rows(&output).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].len(), ROW_VALUES);
        assert_relative_eq!(rows[1][4], 0.9);
        assert_relative_eq!(rows[0][4], 0.0);
    }

    #[test]
    fn test_detection_rows_rejects_face_model_output() {
        let output = OutputTensor {
            shape: vec![1, 20, 8400],
            data: vec![0.0; 20 * 8400],
        };
        assert!(detection_rows(&output).is_err());
    }

    #[test]
    fn test_low_confidence_people_dropped() {
        let rows = vec![person_row(100.0, 100.0, 0.3, 1.0)];
        assert!(decode_people(&rows, &identity(), 0.5, 640, 640).is_empty());
    }

    #[test]
    fn test_invisible_keypoints_dropped() {
        let mut row = person_row(320.0, 320.0, 0.9, 1.0);
        row[5 + 2] = 0.1; // keypoint 0 hidden
        let people = decode_people(&[row], &identity(), 0.5, 640, 640);
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].len(), NUM_KEYPOINTS - 1);
    }

    #[test]
    fn test_duplicate_people_suppressed() {
        let rows = vec![
            person_row(300.0, 300.0, 0.9, 1.0),
            person_row(305.0, 302.0, 0.8, 1.0),
            person_row(50.0, 300.0, 0.7, 1.0),
        ];
        assert_eq!(decode_people(&rows, &identity(), 0.5, 640, 640).len(), 2);
    }

    #[test]
    fn test_keypoints_mapped_through_letterbox() {
        // 200x100 frame letterboxed into 640: scale 3.2, pad_y 160
        let letterbox = Letterbox {
            scale: 3.2,
            pad_x: 0,
            pad_y: 160,
        };
        let mut row = person_row(320.0, 320.0, 0.9, 0.0);
        row[5] = 320.0;
        row[6] = 320.0;
        row[7] = 1.0;
        let people = decode_people(&[row], &letterbox, 0.5, 200, 100);
        assert_eq!(people[0].len(), 1);
        assert_relative_eq!(people[0][0].x, 0.5, epsilon = 1e-9);
        assert_relative_eq!(people[0][0].y, 0.5, epsilon = 1e-9);
    }
}
