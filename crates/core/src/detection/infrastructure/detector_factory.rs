use std::path::PathBuf;
use std::sync::Arc;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::hand_detector::HandDetector;
use crate::detection::domain::pose_detector::PoseDetector;
use crate::detection::domain::segmentation_detector::SegmentationDetector;
use crate::shared::constants::{
    FACE_MODEL_NAME, HAND_LANDMARK_MODEL_NAME, PALM_MODEL_NAME, POSE_MODEL_NAME,
    SEGMENTATION_MODEL_NAME,
};
use crate::shared::frame::Frame;
use crate::shared::model_resolver;
use crate::shared::settings::DetectionSettings;

use super::onnx_blazeface_model::OnnxBlazefaceModel;
use super::onnx_hand_landmark_model::OnnxHandLandmarkModel;
use super::onnx_selfie_segmentation_model::OnnxSelfieSegmentationModel;
use super::onnx_yolo_pose_model::OnnxYoloPoseModel;

/// Download progress for one model: `(model_name, bytes_downloaded, total_bytes)`.
pub type ModelProgress = Arc<dyn Fn(&str, u64, u64) + Send + Sync>;

/// Builds ONNX-backed detectors from [`DetectionSettings`].
///
/// Model files are resolved on demand, so a front end only pays for the
/// models it actually uses.
pub struct DetectorFactory {
    settings: DetectionSettings,
    progress: Option<ModelProgress>,
}

impl DetectorFactory {
    pub fn new(settings: DetectionSettings) -> Self {
        Self {
            settings,
            progress: None,
        }
    }

    pub fn with_progress(
        mut self,
        progress: impl Fn(&str, u64, u64) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn settings(&self) -> &DetectionSettings {
        &self.settings
    }

    pub fn hand_detector(&self) -> Result<HandDetector, Box<dyn std::error::Error>> {
        let palm = self.resolve(PALM_MODEL_NAME)?;
        let landmarks = self.resolve(HAND_LANDMARK_MODEL_NAME)?;
        let model = OnnxHandLandmarkModel::new(
            &palm,
            &landmarks,
            self.settings.hand_confidence,
            self.settings.max_hands,
        )?;
        Ok(HandDetector::new(Box::new(model)))
    }

    pub fn face_detector(&self) -> Result<FaceDetector, Box<dyn std::error::Error>> {
        let path = self.resolve(FACE_MODEL_NAME)?;
        let model = OnnxBlazefaceModel::new(&path, self.settings.face_confidence)?;
        Ok(FaceDetector::new(Box::new(model)))
    }

    pub fn pose_detector(&self) -> Result<PoseDetector, Box<dyn std::error::Error>> {
        let path = self.resolve(POSE_MODEL_NAME)?;
        let model = OnnxYoloPoseModel::new(&path, self.settings.pose_confidence)?;
        Ok(PoseDetector::new(Box::new(model)))
    }

    pub fn segmentation_detector(
        &self,
        background: Frame,
    ) -> Result<SegmentationDetector, Box<dyn std::error::Error>> {
        let path = self.resolve(SEGMENTATION_MODEL_NAME)?;
        let model = OnnxSelfieSegmentationModel::new(&path)?;
        Ok(SegmentationDetector::with_threshold(
            Box::new(model),
            background,
            self.settings.segmentation_threshold,
        ))
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
        log::info!("Resolving model: {name}");
        let progress: Option<model_resolver::ProgressFn> = self.progress.clone().map(|report| {
            let name = name.to_string();
            Box::new(move |downloaded: u64, total: u64| report(&name, downloaded, total))
                as model_resolver::ProgressFn
        });
        let path = model_resolver::resolve(
            name,
            self.settings.models_dir.as_deref(),
            self.settings.model_base_url.as_deref(),
            progress,
        )?;
        Ok(path)
    }
}
