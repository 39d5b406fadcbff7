pub mod detection;
pub mod overlay;
pub mod pipeline;
pub mod shared;
pub mod source;
pub mod video;
