use std::path::Path;

use crate::shared::frame::Frame;
use crate::source::domain::capture_device::CaptureDevice;
use crate::video::domain::image_reader::ImageReader;

use super::ffmpeg_capture_device::FfmpegCaptureDevice;

/// Decodes still images (JPEG, PNG, BMP, ...) through ffmpeg.
///
/// A still image is a one-frame stream, so this opens it like a video file
/// and keeps the first decoded frame.
#[derive(Default)]
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl ImageReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
        let mut device = FfmpegCaptureDevice::open_file(path)
            .map_err(|e| format!("Cannot open image {}: {e}", path.display()))?;
        let frame = device.read();
        device.release();

        let frame = frame?.ok_or_else(|| format!("No image data in {}", path.display()))?;
        log::debug!(
            "Decoded {} ({}x{})",
            path.display(),
            frame.width(),
            frame.height()
        );
        Ok(frame.with_index(0))
    }
}
