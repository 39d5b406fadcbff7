use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use sightline_core::detection::domain::detector::Detector;
use sightline_core::detection::infrastructure::detector_factory::DetectorFactory;
use sightline_core::pipeline::annotate_image_use_case::AnnotateImageUseCase;
use sightline_core::pipeline::live_background_use_case::LiveBackgroundUseCase;
use sightline_core::pipeline::live_loop::LiveRunStats;
use sightline_core::pipeline::live_overlay_use_case::LiveOverlayUseCase;
use sightline_core::pipeline::pose_image_use_case::PoseImageUseCase;
use sightline_core::shared::frame::Frame;
use sightline_core::shared::settings::DetectionSettings;
use sightline_core::source::domain::frame_slot::FrameSlot;
use sightline_core::source::infrastructure::camera_source::CameraSource;
use sightline_core::video::domain::image_reader::ImageReader;
use sightline_core::video::infrastructure::ffmpeg_capture_device::FfmpegCaptureDevice;
use sightline_core::video::infrastructure::image_file_reader::ImageFileReader;

use super::status_logger::StatusLogger;

/// What the worker should show.
#[derive(Debug, Clone)]
pub enum Job {
    /// Hand landmarks and face boxes on a still image.
    Image { path: PathBuf },
    /// Body keypoints on a still image.
    Pose { path: PathBuf },
    /// Live hand and face overlay.
    Camera { device: String },
    /// Live background replacement.
    Background { device: String, background: PathBuf },
    /// Annotated still image, then the live overlay once the user moves on.
    Demo { image: PathBuf, device: String },
}

/// Messages sent from the worker thread to the UI.
pub enum WorkerMessage {
    Status(String),
    DownloadProgress(String, u64, u64),
    /// A finished still image. `advance` is set when the next key press
    /// should move the job on instead of quitting.
    Still { frame: Arc<Frame>, advance: bool },
    /// Display slot of a running camera.
    Live(Arc<FrameSlot>),
    Finished(String),
    Error(String),
}

/// Messages sent from the UI to the worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Advance,
}

/// UI-side handles to a running worker.
#[derive(Clone)]
pub struct WorkerSession {
    pub messages: Receiver<WorkerMessage>,
    pub control: Sender<Control>,
    pub cancelled: Arc<AtomicBool>,
}

/// Spawn the detection worker. Returns the UI handles and the thread handle.
pub fn spawn(
    job: Job,
    settings: DetectionSettings,
) -> std::io::Result<(WorkerSession, JoinHandle<()>)> {
    let (tx, rx) = crossbeam_channel::unbounded::<WorkerMessage>();
    let (control_tx, control_rx) = crossbeam_channel::unbounded::<Control>();
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_clone = cancelled.clone();

    let handle = thread::Builder::new()
        .name("detection".to_string())
        .spawn(move || {
            if let Err(e) = run_job(job, settings, &tx, &control_rx, &cancelled_clone) {
                log::error!("Detection worker failed: {e}");
                let _ = tx.send(WorkerMessage::Error(e.to_string()));
            }
        })?;

    Ok((
        WorkerSession {
            messages: rx,
            control: control_tx,
            cancelled,
        },
        handle,
    ))
}

fn run_job(
    job: Job,
    settings: DetectionSettings,
    tx: &Sender<WorkerMessage>,
    control: &Receiver<Control>,
    cancelled: &Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let progress_tx = tx.clone();
    let factory = DetectorFactory::new(settings).with_progress(move |name, downloaded, total| {
        let _ = progress_tx.send(WorkerMessage::DownloadProgress(
            name.to_string(),
            downloaded,
            total,
        ));
    });

    match job {
        Job::Image { path } => {
            let frame = annotate(&factory, &path, tx)?;
            let _ = tx.send(WorkerMessage::Still {
                frame,
                advance: false,
            });
        }
        Job::Pose { path } => {
            let _ = tx.send(WorkerMessage::Status("Loading pose model...".to_string()));
            let mut use_case = PoseImageUseCase::new(
                Box::new(ImageFileReader::new()),
                None,
                factory.pose_detector()?,
                Box::new(StatusLogger::new(tx.clone())),
            );
            let annotation = use_case.execute(&path, None)?;
            let _ = tx.send(WorkerMessage::Still {
                frame: Arc::new(annotation.rendered),
                advance: false,
            });
        }
        Job::Camera { device } => {
            let stats = live_overlay(&factory, &device, tx, cancelled)?;
            finish(tx, &stats);
        }
        Job::Background { device, background } => {
            let background = ImageFileReader::new().read(&background)?;
            let mut use_case = LiveBackgroundUseCase::new(
                factory.segmentation_detector(background)?,
                Box::new(StatusLogger::new(tx.clone())),
            );
            let camera = start_camera(&device, tx, cancelled)?;
            let stats = use_case.execute(&camera)?;
            finish(tx, &stats);
        }
        Job::Demo { image, device } => {
            let frame = annotate(&factory, &image, tx)?;
            let _ = tx.send(WorkerMessage::Still {
                frame,
                advance: true,
            });
            if !wait_for_advance(control, cancelled) {
                return Ok(());
            }
            let stats = live_overlay(&factory, &device, tx, cancelled)?;
            finish(tx, &stats);
        }
    }
    Ok(())
}

fn annotate(
    factory: &DetectorFactory,
    path: &Path,
    tx: &Sender<WorkerMessage>,
) -> Result<Arc<Frame>, Box<dyn std::error::Error>> {
    let _ = tx.send(WorkerMessage::Status("Loading hand and face models...".to_string()));
    let mut use_case = AnnotateImageUseCase::new(
        Box::new(ImageFileReader::new()),
        None,
        hands_and_faces(factory)?,
        Box::new(StatusLogger::new(tx.clone())),
    );
    let annotation = use_case.execute(path, None)?;
    let _ = tx.send(WorkerMessage::Status(format!(
        "{}: {} hand landmarks, {} faces",
        path.display(),
        annotation.overlay.points.len(),
        annotation.overlay.boxes.len()
    )));
    Ok(Arc::new(annotation.rendered))
}

fn live_overlay(
    factory: &DetectorFactory,
    device: &str,
    tx: &Sender<WorkerMessage>,
    cancelled: &Arc<AtomicBool>,
) -> Result<LiveRunStats, Box<dyn std::error::Error>> {
    let _ = tx.send(WorkerMessage::Status("Loading hand and face models...".to_string()));
    let mut use_case =
        LiveOverlayUseCase::new(hands_and_faces(factory)?, Box::new(StatusLogger::new(tx.clone())));
    let camera = start_camera(device, tx, cancelled)?;
    use_case.execute(&camera)
}

fn hands_and_faces(
    factory: &DetectorFactory,
) -> Result<Vec<(String, Box<dyn Detector>)>, Box<dyn std::error::Error>> {
    let hands: Box<dyn Detector> = Box::new(factory.hand_detector()?);
    let faces: Box<dyn Detector> = Box::new(factory.face_detector()?);
    Ok(vec![("hands".to_string(), hands), ("faces".to_string(), faces)])
}

/// Opens `device` and starts capturing with the display step enabled.
/// The camera shares the UI's cancel flag, so quitting stops capture.
fn start_camera(
    device: &str,
    tx: &Sender<WorkerMessage>,
    cancelled: &Arc<AtomicBool>,
) -> Result<CameraSource, Box<dyn std::error::Error>> {
    let capture = FfmpegCaptureDevice::open(device)?;
    let mut camera =
        CameraSource::new(device, Box::new(capture)).with_cancel_flag(cancelled.clone());
    camera.set_show(true);
    camera.start()?;
    let _ = tx.send(WorkerMessage::Live(camera.display()));
    let _ = tx.send(WorkerMessage::Status(format!("Watching {device}, press q to quit")));
    Ok(camera)
}

/// Blocks until the UI asks to advance. False if the UI went away or the
/// user quit instead.
fn wait_for_advance(control: &Receiver<Control>, cancelled: &AtomicBool) -> bool {
    loop {
        match control.recv_timeout(Duration::from_millis(100)) {
            Ok(Control::Advance) => return true,
            Err(RecvTimeoutError::Timeout) => {
                if cancelled.load(Ordering::Acquire) {
                    return false;
                }
            }
            Err(RecvTimeoutError::Disconnected) => return false,
        }
    }
}

fn finish(tx: &Sender<WorkerMessage>, stats: &LiveRunStats) {
    let _ = tx.send(WorkerMessage::Finished(format!(
        "Stopped after {} frames ({} skipped)",
        stats.processed, stats.skipped
    )));
}
