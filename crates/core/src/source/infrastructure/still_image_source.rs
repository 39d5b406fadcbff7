use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::overlay::annotations::Overlay;
use crate::overlay::renderer::render;
use crate::shared::frame::Frame;
use crate::source::domain::frame_source::FrameSource;
use crate::video::domain::image_reader::ImageReader;

/// A source whose single frame is decoded once, at construction.
pub struct StillImageSource {
    path: PathBuf,
    frame: Arc<Frame>,
}

impl StillImageSource {
    pub fn open(path: &Path, reader: &dyn ImageReader) -> Result<Self, Box<dyn std::error::Error>> {
        let frame = reader.read(path)?;
        log::info!(
            "Loaded {} ({}x{})",
            path.display(),
            frame.width(),
            frame.height()
        );
        Ok(Self::from_frame(path, frame))
    }

    pub fn from_frame(path: &Path, frame: Frame) -> Self {
        Self {
            path: path.to_path_buf(),
            frame: Arc::new(frame),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frame(&self) -> &Arc<Frame> {
        &self.frame
    }

    /// The frame as it should be presented with `overlay` applied.
    pub fn render(&self, overlay: &Overlay) -> Frame {
        render(&self.frame, overlay)
    }
}

impl FrameSource for StillImageSource {
    fn current(&self) -> Option<Arc<Frame>> {
        Some(self.frame.clone())
    }
}
