use crate::shared::frame::Frame;
use crate::source::domain::frame_source::FrameSource;

use super::detection_result::DetectionResult;

/// Domain interface shared by every detector variant.
///
/// An absent frame yields the variant's neutral result and never fails.
/// Implementations hold a model handle, hence `&mut self`.
pub trait Detector: Send {
    fn detect(
        &mut self,
        frame: Option<&Frame>,
    ) -> Result<DetectionResult, Box<dyn std::error::Error>>;

    /// Runs on whatever frame `source` currently holds.
    fn detect_source(
        &mut self,
        source: &dyn FrameSource,
    ) -> Result<DetectionResult, Box<dyn std::error::Error>> {
        let frame = source.current();
        self.detect(frame.as_deref())
    }
}
