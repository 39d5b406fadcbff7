mod app;
mod workers;

use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;

use clap::{Args, Parser, Subcommand};

use sightline_core::shared::constants::{DEFAULT_CAMERA_INDEX, DEMO_IMAGE_PATH, WINDOW_TITLE};
use sightline_core::shared::model_resolver;
use sightline_core::shared::settings::{
    DetectionSettings, DEFAULT_CONFIDENCE, DEFAULT_MAX_HANDS, DEFAULT_SEGMENTATION_THRESHOLD,
};

use app::App;
use workers::detection_worker::{self, Job};

/// Windowed viewer for hand, face, pose and background detection.
#[derive(Parser)]
#[command(name = "sightline-desktop")]
struct Cli {
    #[command(flatten)]
    detection: DetectionArgs,

    /// What to show (default: demo).
    #[command(subcommand)]
    mode: Option<Mode>,
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
enum Mode {
    /// Hand landmarks and face boxes on a still image.
    Image { path: PathBuf },
    /// Live hand landmarks and face boxes.
    Camera {
        /// Camera index or video file.
        #[arg(long, default_value_t = DEFAULT_CAMERA_INDEX.to_string())]
        device: String,
    },
    /// Body keypoints on a still image.
    Pose { path: PathBuf },
    /// Live background replacement.
    Background {
        background: PathBuf,
        #[arg(long, default_value_t = DEFAULT_CAMERA_INDEX.to_string())]
        device: String,
    },
    /// Annotate an image, then switch to the live overlay on q.
    Demo {
        #[arg(long, default_value = DEMO_IMAGE_PATH)]
        image: PathBuf,
        #[arg(long, default_value_t = DEFAULT_CAMERA_INDEX.to_string())]
        device: String,
    },
}

fn main() -> iced::Result {
    env_logger::init();

    let (job, settings) = match prepare(Cli::parse()) {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    let (session, worker) = match detection_worker::spawn(job, settings) {
        Ok(spawned) => spawned,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    let cancelled = session.cancelled.clone();

    let result = iced::application(move || App::new(session.clone()), App::update, App::view)
        .title(WINDOW_TITLE)
        .subscription(App::subscription)
        .window(iced::window::Settings {
            size: iced::Size::new(960.0, 720.0),
            ..Default::default()
        })
        .run();

    // Window closed: stop the camera and let the device guard release it.
    cancelled.store(true, Ordering::Release);
    if worker.join().is_err() {
        log::error!("Detection worker panicked");
    }
    result
}

fn prepare(cli: Cli) -> Result<(Job, DetectionSettings), Box<dyn std::error::Error>> {
    let settings = settings_from(&cli.detection);
    settings.validate()?;

    let job = match cli.mode.unwrap_or(Mode::Demo {
        image: PathBuf::from(DEMO_IMAGE_PATH),
        device: DEFAULT_CAMERA_INDEX.to_string(),
    }) {
        Mode::Image { path } => Job::Image { path },
        Mode::Camera { device } => Job::Camera { device },
        Mode::Pose { path } => Job::Pose { path },
        Mode::Background { background, device } => Job::Background { device, background },
        Mode::Demo { image, device } => Job::Demo { image, device },
    };

    let image = match &job {
        Job::Image { path } | Job::Pose { path } => Some(path),
        Job::Background { background, .. } => Some(background),
        Job::Demo { image, .. } => Some(image),
        Job::Camera { .. } => None,
    };
    if let Some(path) = image {
        if !path.exists() {
            return Err(format!("Input file not found: {}", path.display()).into());
        }
    }
    Ok((job, settings))
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

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sightline-desktop").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_default_mode_is_demo() {
        let cli = parse(&[]);
        assert!(cli.mode.is_none());
    }

    #[test]
    fn test_camera_needs_no_file() {
        let (job, settings) = prepare(parse(&["camera", "--device", "clip.mp4"])).unwrap();
        assert!(matches!(job, Job::Camera { ref device } if device == "clip.mp4"));
        assert_eq!(settings.max_hands, DEFAULT_MAX_HANDS);
    }

    #[test]
    fn test_missing_image_rejected() {
        let err = prepare(parse(&["image", "/nonexistent/hands.jpg"])).err().unwrap();
        assert!(err.to_string().contains("Input file not found"));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let err = prepare(parse(&["--threshold", "1.5", "camera"])).err().unwrap();
        assert!(err.to_string().contains("between 0.0 and 1.0"));
    }

    #[test]
    fn test_background_mode_carries_both_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let bg = dir.path().join("beach.png");
        std::fs::write(&bg, b"").unwrap();
        let cli = parse(&["background", bg.to_str().unwrap(), "--device", "1"]);
        let (job, _) = prepare(cli).unwrap();
        match job {
            Job::Background { device, background } => {
                assert_eq!(device, "1");
                assert_eq!(background, bg);
            }
            _ => panic!("expected a background job"),
        }
    }
}
