pub mod detection_worker;
pub mod status_logger;
