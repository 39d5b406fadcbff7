pub mod capture_device;
pub mod frame_slot;
pub mod frame_source;
pub mod live_feed;
