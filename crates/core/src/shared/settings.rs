use std::path::PathBuf;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_MAX_HANDS: usize = 4;

/// Mask confidence above which a pixel counts as foreground.
pub const DEFAULT_SEGMENTATION_THRESHOLD: f32 = 0.1;

/// Detector thresholds and model locations shared by both front ends.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionSettings {
    pub models_dir: Option<PathBuf>,
    pub model_base_url: Option<String>,
    pub face_confidence: f64,
    pub hand_confidence: f64,
    pub max_hands: usize,
    pub pose_confidence: f64,
    pub segmentation_threshold: f32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            models_dir: None,
            model_base_url: None,
            face_confidence: DEFAULT_CONFIDENCE,
            hand_confidence: DEFAULT_CONFIDENCE,
            max_hands: DEFAULT_MAX_HANDS,
            pose_confidence: DEFAULT_CONFIDENCE,
            segmentation_threshold: DEFAULT_SEGMENTATION_THRESHOLD,
        }
    }
}

impl DetectionSettings {
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        for (name, value) in [
            ("Face confidence", self.face_confidence),
            ("Hand confidence", self.hand_confidence),
            ("Pose confidence", self.pose_confidence),
            ("Segmentation threshold", self.segmentation_threshold as f64),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} must be between 0.0 and 1.0, got {value}").into());
            }
        }
        if self.max_hands == 0 {
            return Err("Max hands must be at least 1".into());
        }
        if let Some(dir) = &self.models_dir {
            if !dir.is_dir() {
                return Err(format!("Models directory not found: {}", dir.display()).into());
            }
        }
        Ok(())
    }
}
