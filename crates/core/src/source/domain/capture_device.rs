use crate::shared::frame::Frame;

/// A device (or stream) that yields frames one at a time.
///
/// Implementations own the underlying handle. The capture loop calls
/// [`release`](CaptureDevice::release) on every exit path, so it must be
/// idempotent.
pub trait CaptureDevice: Send {
    /// Reads the next frame. `Ok(None)` signals end-of-stream.
    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the device. Subsequent reads return `Ok(None)`.
    fn release(&mut self);

    /// Human-readable description for logs.
    fn describe(&self) -> String {
        "capture device".to_string()
    }
}
