pub mod detection_result;
pub mod detector;
pub mod face_detector;
pub mod hand_detector;
pub mod models;
pub mod pose_detector;
pub mod segmentation_detector;
pub mod segmentation_mask;
