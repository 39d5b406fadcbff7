use std::sync::Arc;

use crate::overlay::annotations::Overlay;
use crate::shared::frame::Frame;

/// What a live detection loop needs from a continuously updating source.
pub trait LiveFeed: Send + Sync {
    /// Latest frame and its publish generation (0 = nothing yet).
    fn snapshot(&self) -> (Option<Arc<Frame>>, u64);

    /// False once the producer has stopped (quit, end-of-stream, error).
    fn is_live(&self) -> bool;

    /// Hands detection results back for presentation.
    fn publish_overlay(&self, overlay: Overlay);
}
