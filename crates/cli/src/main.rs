use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};

use sightline_core::detection::domain::detector::Detector;
use sightline_core::detection::infrastructure::detector_factory::DetectorFactory;
use sightline_core::pipeline::annotate_image_use_case::AnnotateImageUseCase;
use sightline_core::pipeline::live_background_use_case::LiveBackgroundUseCase;
use sightline_core::pipeline::live_loop::LiveRunStats;
use sightline_core::pipeline::live_overlay_use_case::LiveOverlayUseCase;
use sightline_core::pipeline::pipeline_logger::StatsPipelineLogger;
use sightline_core::pipeline::pose_image_use_case::PoseImageUseCase;
use sightline_core::shared::constants::{DEFAULT_CAMERA_INDEX, IMAGE_EXTENSIONS};
use sightline_core::shared::model_resolver;
use sightline_core::shared::settings::{
    DetectionSettings, DEFAULT_CONFIDENCE, DEFAULT_MAX_HANDS, DEFAULT_SEGMENTATION_THRESHOLD,
};
use sightline_core::source::infrastructure::camera_source::CameraSource;
use sightline_core::video::domain::image_reader::ImageReader;
use sightline_core::video::domain::image_writer::ImageWriter;
use sightline_core::video::infrastructure::ffmpeg_capture_device::FfmpegCaptureDevice;
use sightline_core::video::infrastructure::image_file_reader::ImageFileReader;
use sightline_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Hand, face, pose and background detection for images and cameras.
#[derive(Parser)]
#[command(name = "sightline")]
struct Cli {
    #[command(flatten)]
    detection: DetectionArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct DetectionArgs {
    /// Directory searched first for model files.
    #[arg(long, global = true)]
    models_dir: Option<PathBuf>,

    /// Base URL to download missing models from (overrides SIGHTLINE_MODEL_BASE_URL).
    #[arg(long, global = true)]
    model_base_url: Option<String>,

    /// Minimum confidence for hands, faces and people (0.0-1.0).
    #[arg(long, global = true, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Maximum number of hands to track.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_HANDS)]
    max_hands: usize,

    /// Mask confidence above which a pixel is kept as foreground (0.0-1.0).
    #[arg(long, global = true, default_value_t = DEFAULT_SEGMENTATION_THRESHOLD)]
    threshold: f32,
}

#[derive(Subcommand)]
enum Command {
    /// Draw hand landmarks and face boxes on a still image.
    Annotate {
        input: PathBuf,
        /// Where to write the annotated image.
        output: PathBuf,
    },
    /// Draw body keypoints on a still image.
    Pose { input: PathBuf, output: PathBuf },
    /// Replace the background of a still image.
    Segment {
        input: PathBuf,
        background: PathBuf,
        output: PathBuf,
    },
    /// Run live detection on a camera index or video file until it ends.
    Watch {
        /// Camera index or video file.
        #[arg(long, default_value_t = DEFAULT_CAMERA_INDEX.to_string())]
        device: String,

        /// Replace the background with this image instead of drawing
        /// hands and faces.
        #[arg(long)]
        background: Option<PathBuf>,

        /// Skip hand landmarks.
        #[arg(long)]
        no_hands: bool,

        /// Skip face boxes.
        #[arg(long)]
        no_faces: bool,

        /// Write the last displayed frame here when the run ends.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let factory =
        DetectorFactory::new(settings_from(&cli.detection)).with_progress(download_progress);

    match cli.command {
        Command::Annotate { input, output } => {
            let detectors = hands_and_faces(&factory, true, true)?;
            let mut use_case = AnnotateImageUseCase::new(
                image_reader(),
                Some(image_writer()),
                detectors,
                Box::new(StatsPipelineLogger::default()),
            );
            let annotation = use_case.execute(&input, Some(&output))?;
            log::info!(
                "{} hand landmarks, {} faces",
                annotation.overlay.points.len(),
                annotation.overlay.boxes.len()
            );
        }
        Command::Pose { input, output } => {
            let mut use_case = PoseImageUseCase::new(
                image_reader(),
                Some(image_writer()),
                factory.pose_detector()?,
                Box::new(StatsPipelineLogger::default()),
            );
            use_case.execute(&input, Some(&output))?;
        }
        Command::Segment {
            input,
            background,
            output,
        } => {
            let background = image_reader().read(&background)?;
            let detector: Box<dyn Detector> = Box::new(factory.segmentation_detector(background)?);
            let mut use_case = AnnotateImageUseCase::new(
                image_reader(),
                Some(image_writer()),
                vec![("segmentation".to_string(), detector)],
                Box::new(StatsPipelineLogger::default()),
            );
            use_case.execute(&input, Some(&output))?;
        }
        Command::Watch {
            device,
            background,
            no_hands,
            no_faces,
            snapshot,
        } => {
            let stats = run_watch(
                &factory,
                &device,
                background.as_deref(),
                !no_hands,
                !no_faces,
                snapshot.as_deref(),
            )?;
            log::info!(
                "Processed {} frames ({} skipped)",
                stats.processed,
                stats.skipped
            );
        }
    }

    Ok(())
}

fn run_watch(
    factory: &DetectorFactory,
    device: &str,
    background: Option<&Path>,
    hands: bool,
    faces: bool,
    snapshot: Option<&Path>,
) -> Result<LiveRunStats, Box<dyn std::error::Error>> {
    // Models load before the device opens.
    enum Live {
        Overlay(LiveOverlayUseCase),
        Background(LiveBackgroundUseCase),
    }
    let mut live = match background {
        Some(path) => {
            let detector = factory.segmentation_detector(image_reader().read(path)?)?;
            Live::Background(LiveBackgroundUseCase::new(
                detector,
                Box::new(StatsPipelineLogger::default()),
            ))
        }
        None => Live::Overlay(LiveOverlayUseCase::new(
            hands_and_faces(factory, hands, faces)?,
            Box::new(StatsPipelineLogger::default()),
        )),
    };

    let capture = FfmpegCaptureDevice::open(device)?;
    let mut camera = CameraSource::new(device, Box::new(capture));
    camera.set_show(snapshot.is_some());
    camera.start()?;

    let result = match &mut live {
        Live::Overlay(use_case) => use_case.execute(&camera),
        Live::Background(use_case) => use_case.execute(&camera),
    };
    camera.stop();

    if let Some(path) = snapshot {
        let display = camera.display();
        match display.latest() {
            Some(frame) => {
                image_writer().write(path, &frame)?;
                log::info!("Snapshot written to {}", path.display());
            }
            None => log::warn!("No frame was displayed; snapshot not written"),
        }
    }
    result
}

fn hands_and_faces(
    factory: &DetectorFactory,
    hands: bool,
    faces: bool,
) -> Result<Vec<(String, Box<dyn Detector>)>, Box<dyn std::error::Error>> {
    let mut detectors: Vec<(String, Box<dyn Detector>)> = Vec::new();
    if hands {
        let detector: Box<dyn Detector> = Box::new(factory.hand_detector()?);
        detectors.push(("hands".to_string(), detector));
    }
    if faces {
        let detector: Box<dyn Detector> = Box::new(factory.face_detector()?);
        detectors.push(("faces".to_string(), detector));
    }
    Ok(detectors)
}

fn settings_from(args: &DetectionArgs) -> DetectionSettings {
    DetectionSettings {
        models_dir: args.models_dir.clone(),
        model_base_url: args
            .model_base_url
            .clone()
            .or_else(model_resolver::base_url_from_env),
        face_confidence: args.confidence,
        hand_confidence: args.confidence,
        max_hands: args.max_hands,
        pose_confidence: args.confidence,
        segmentation_threshold: args.threshold,
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    settings_from(&cli.detection).validate()?;

    let images: Vec<&Path> = match &cli.command {
        Command::Annotate { input, .. } | Command::Pose { input, .. } => vec![input.as_path()],
        Command::Segment {
            input, background, ..
        } => vec![input.as_path(), background.as_path()],
        Command::Watch {
            background,
            no_hands,
            no_faces,
            ..
        } => {
            if background.is_none() && *no_hands && *no_faces {
                return Err("Nothing to detect: --no-hands and --no-faces both set".into());
            }
            background.iter().map(PathBuf::as_path).collect()
        }
    };
    for path in images {
        if !path.exists() {
            return Err(format!("Input file not found: {}", path.display()).into());
        }
        if !is_image(path) {
            return Err(format!("Not a supported image file: {}", path.display()).into());
        }
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn image_reader() -> Box<dyn ImageReader> {
    Box::new(ImageFileReader::new())
}

fn image_writer() -> Box<dyn ImageWriter> {
    Box::new(ImageFileWriter::new())
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
}
