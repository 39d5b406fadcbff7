use std::sync::Arc;

use crate::shared::frame::Frame;

/// Anything that can hand out its most recent frame.
///
/// `None` means no frame has been produced yet (e.g. a camera before its
/// first capture); detectors treat that as "nothing to detect".
pub trait FrameSource: Send + Sync {
    fn current(&self) -> Option<Arc<Frame>>;
}
