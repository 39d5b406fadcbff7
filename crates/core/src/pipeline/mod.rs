pub mod annotate_image_use_case;
pub mod live_background_use_case;
pub mod live_loop;
pub mod live_overlay_use_case;
pub mod pipeline_logger;
pub mod pose_image_use_case;
