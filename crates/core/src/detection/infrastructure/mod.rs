pub mod anchors;
pub mod detector_factory;
pub mod math;
pub mod onnx_blazeface_model;
pub mod onnx_hand_landmark_model;
pub mod onnx_selfie_segmentation_model;
pub mod onnx_yolo_pose_model;
pub mod session;
pub mod tensor;
