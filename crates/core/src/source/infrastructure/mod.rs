pub mod camera_source;
pub mod still_image_source;
