use std::time::{Duration, Instant};

use crate::overlay::annotations::Overlay;
use crate::shared::frame::Frame;
use crate::source::domain::live_feed::LiveFeed;

use super::pipeline_logger::PipelineLogger;

/// Pause between polls when no new frame has been published.
pub const DEFAULT_IDLE: Duration = Duration::from_millis(5);

/// Counters for one live run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LiveRunStats {
    /// Frames that went through detection.
    pub processed: u64,
    /// Frames published by the source that detection never saw.
    pub skipped: u64,
}

/// Drives `on_frame` once per newly published frame until the feed stops.
///
/// Each returned overlay is handed back through
/// [`LiveFeed::publish_overlay`]. A frame still pending when the feed stops
/// is processed before returning. Errors from `on_frame` end the run.
pub fn run_live<F>(
    feed: &dyn LiveFeed,
    idle: Duration,
    logger: &mut dyn PipelineLogger,
    mut on_frame: F,
) -> Result<LiveRunStats, Box<dyn std::error::Error>>
where
    F: FnMut(&Frame, &mut dyn PipelineLogger) -> Result<Overlay, Box<dyn std::error::Error>>,
{
    let mut stats = LiveRunStats::default();
    let mut last_generation = 0;

    loop {
        let live = feed.is_live();
        let (frame, generation) = feed.snapshot();

        match frame {
            Some(frame) if generation != last_generation => {
                if last_generation > 0 && generation > last_generation + 1 {
                    stats.skipped += generation - last_generation - 1;
                }
                last_generation = generation;

                let start = Instant::now();
                let overlay = on_frame(&frame, &mut *logger)?;
                logger.timing("frame", start.elapsed().as_secs_f64() * 1000.0);

                log::debug!(
                    "Frame {}: {} points, {} boxes",
                    frame.index(),
                    overlay.points.len(),
                    overlay.boxes.len()
                );
                feed.publish_overlay(overlay);
                stats.processed += 1;
                logger.progress(stats.processed as usize, 0);
            }
            _ if !live => break,
            _ => std::thread::sleep(idle),
        }
    }

    if stats.skipped > 0 {
        log::warn!(
            "Detection fell behind capture: {} frames skipped",
            stats.skipped
        );
        logger.metric("skipped_frames", stats.skipped as f64);
    }
    logger.info(&format!("Live run finished after {} frames", stats.processed));
    Ok(stats)
}
