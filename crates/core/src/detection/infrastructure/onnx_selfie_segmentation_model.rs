//! Person/background segmentation (MediaPipe selfie segmentation) via `ort`.
use std::path::Path;

use crate::detection::domain::models::SegmentationModel;
use crate::detection::domain::segmentation_mask::SegmentationMask;
use crate::shared::frame::Frame;

use super::math::as_probability;
use super::session::{ModelSession, OutputTensor, TensorLayout};
use super::tensor::{resize_to_tensor, PixelRange};

/// General-purpose model input resolution (the landscape variant is 256×144
/// and is picked up from the model itself).
const INPUT_SIZE: u32 = 256;

pub struct OnnxSelfieSegmentationModel {
    session: ModelSession,
}

impl OnnxSelfieSegmentationModel {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ModelSession::open(model_path, TensorLayout::Nhwc, INPUT_SIZE)?;
        Ok(Self { session })
    }
}

impl SegmentationModel for OnnxSelfieSegmentationModel {
    fn process(&mut self, frame: &Frame) -> Result<SegmentationMask, Box<dyn std::error::Error>> {
        let input = resize_to_tensor(
            frame,
            self.session.input_width(),
            self.session.input_height(),
            self.session.layout(),
            PixelRange::Unit,
        );
        let outputs = self.session.run(input)?;
        mask_from_output(&outputs[0])
    }
}

/// Reads a single-channel confidence map, `[1, H, W, 1]`, `[1, 1, H, W]`
/// or `[1, H, W]`.
fn mask_from_output(output: &OutputTensor) -> Result<SegmentationMask, Box<dyn std::error::Error>> {
    let spatial: Vec<usize> = output
        .shape
        .iter()
        .copied()
        .filter(|&d| d != 1)
        .collect();
    let &[height, width] = spatial.as_slice() else {
        return Err(format!(
            "Expected a single-channel segmentation map, got shape {:?}",
            output.shape
        )
        .into());
    };

    let values = output.data.iter().map(|&v| as_probability(v)).collect();
    SegmentationMask::new(values, width as u32, height as u32)
}
