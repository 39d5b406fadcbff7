pub const FACE_MODEL_NAME: &str = "face_detection_full_range.onnx";
pub const PALM_MODEL_NAME: &str = "palm_detection_full.onnx";
pub const HAND_LANDMARK_MODEL_NAME: &str = "hand_landmark_full.onnx";
pub const POSE_MODEL_NAME: &str = "yolo11n-pose.onnx";
pub const SEGMENTATION_MODEL_NAME: &str = "selfie_segmentation.onnx";

/// Environment variable naming a base URL that serves the model files.
pub const MODEL_BASE_URL_ENV: &str = "SIGHTLINE_MODEL_BASE_URL";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Image annotated by the built-in demo sequence.
pub const DEMO_IMAGE_PATH: &str = "wll-asl.jpg";

pub const DEFAULT_CAMERA_INDEX: u32 = 0;

/// Title of the desktop viewer window.
pub const WINDOW_TITLE: &str = "Sightline";
