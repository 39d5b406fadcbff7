use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::overlay::annotations::Overlay;
use crate::overlay::renderer::render_shared;
use crate::shared::frame::Frame;
use crate::source::domain::capture_device::CaptureDevice;
use crate::source::domain::frame_slot::{FrameSlot, SharedSlot};
use crate::source::domain::frame_source::FrameSource;
use crate::source::domain::live_feed::LiveFeed;

/// Live source backed by a capture device read on its own thread.
///
/// Layout: `device → capture thread → frame slot`, plus, while showing,
/// `frame + latest overlay → display slot`. Detection loops read the frame
/// slot and hand their results back through [`publish_overlay`].
///
/// The device is released on every exit path of the capture thread.
///
/// [`publish_overlay`]: CameraSource::publish_overlay
pub struct CameraSource {
    name: String,
    device: Mutex<Option<Box<dyn CaptureDevice>>>,
    shared: CaptureShared,
    handle: Option<JoinHandle<()>>,
}

/// State shared between the owner and the capture thread.
#[derive(Clone)]
struct CaptureShared {
    frames: Arc<FrameSlot>,
    overlay: Arc<SharedSlot<Overlay>>,
    display: Arc<FrameSlot>,
    show: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    captured: Arc<AtomicU64>,
}

impl CameraSource {
    pub fn new(name: impl Into<String>, device: Box<dyn CaptureDevice>) -> Self {
        Self {
            name: name.into(),
            device: Mutex::new(Some(device)),
            shared: CaptureShared {
                frames: Arc::new(FrameSlot::new()),
                overlay: Arc::new(SharedSlot::new()),
                display: Arc::new(FrameSlot::new()),
                show: Arc::new(AtomicBool::new(false)),
                cancelled: Arc::new(AtomicBool::new(false)),
                running: Arc::new(AtomicBool::new(false)),
                captured: Arc::new(AtomicU64::new(0)),
            },
            handle: None,
        }
    }

    /// Shares a quit flag with other components (e.g. the viewer window).
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.shared.cancelled = cancelled;
        self
    }

    /// Spawns the capture thread. Fails if already started.
    pub fn start(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let device = self
            .pending_device()
            .take()
            .ok_or_else(|| format!("{}: capture already started", self.name))?;

        self.shared.running.store(true, Ordering::Release);
        let shared = self.shared.clone();
        let handle = std::thread::Builder::new()
            .name(format!("capture-{}", self.name))
            .spawn(move || capture_loop(device, shared));

        match handle {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                Err(format!("{}: failed to spawn capture thread: {e}", self.name).into())
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn toggle_show(&self) {
        self.shared.show.fetch_xor(true, Ordering::AcqRel);
    }

    pub fn set_show(&self, show: bool) {
        self.shared.show.store(show, Ordering::Release);
    }

    pub fn is_showing(&self) -> bool {
        self.shared.show.load(Ordering::Acquire)
    }

    /// Hands detection results to the display step of the capture loop.
    pub fn publish_overlay(&self, overlay: Overlay) {
        self.shared.overlay.publish(overlay);
    }

    /// Latest captured frames, unannotated.
    pub fn frames(&self) -> Arc<FrameSlot> {
        self.shared.frames.clone()
    }

    /// Frames as presented (overlay applied); only fed while showing.
    pub fn display(&self) -> Arc<FrameSlot> {
        self.shared.display.clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn frames_captured(&self) -> u64 {
        self.shared.captured.load(Ordering::Relaxed)
    }

    /// Signals the capture thread to quit and waits for it.
    pub fn stop(&mut self) {
        self.shared.cancelled.store(true, Ordering::Release);
        self.join();
    }

    /// Waits for the capture loop to end on its own (quit or end-of-stream).
    pub fn wait(&mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("{}: capture thread panicked", self.name);
            }
        }
        // Never started: drop the device now rather than at destruction.
        if let Some(mut device) = self.pending_device().take() {
            device.release();
        }
    }

    /// The device until the capture thread takes ownership of it.
    fn pending_device(&mut self) -> &mut Option<Box<dyn CaptureDevice>> {
        self.device
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FrameSource for CameraSource {
    fn current(&self) -> Option<Arc<Frame>> {
        self.shared.frames.latest()
    }
}

impl LiveFeed for CameraSource {
    fn snapshot(&self) -> (Option<Arc<Frame>>, u64) {
        self.shared.frames.snapshot()
    }

    fn is_live(&self) -> bool {
        self.is_running() && !self.shared.cancelled.load(Ordering::Acquire)
    }

    fn publish_overlay(&self, overlay: Overlay) {
        CameraSource::publish_overlay(self, overlay);
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Releases the device and clears the running flag when the thread exits,
/// including by panic.
struct DeviceGuard {
    device: Box<dyn CaptureDevice>,
    running: Arc<AtomicBool>,
}

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        self.device.release();
        self.running.store(false, Ordering::Release);
        log::info!("Released {}", self.device.describe());
    }
}

fn capture_loop(device: Box<dyn CaptureDevice>, shared: CaptureShared) {
    let mut guard = DeviceGuard {
        device,
        running: shared.running.clone(),
    };
    log::info!("Capturing from {}", guard.device.describe());

    loop {
        if shared.cancelled.load(Ordering::Acquire) {
            log::info!("Capture stopped by user");
            break;
        }

        let frame = match guard.device.read() {
            Ok(Some(frame)) => Arc::new(frame),
            Ok(None) => {
                log::info!("{} reached end of stream", guard.device.describe());
                break;
            }
            Err(e) => {
                log::error!("Capture from {} failed: {e}", guard.device.describe());
                break;
            }
        };

        shared.frames.publish_shared(frame.clone());
        shared.captured.fetch_add(1, Ordering::Relaxed);

        if shared.show.load(Ordering::Acquire) {
            let shown = match shared.overlay.latest() {
                Some(overlay) => render_shared(&frame, &overlay),
                None => frame,
            };
            shared.display.publish_shared(shown);
        }
    }
}
