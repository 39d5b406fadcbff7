use std::time::{Duration, Instant};

use crate::detection::domain::detector::Detector;
use crate::overlay::annotations::Overlay;
use crate::source::domain::live_feed::LiveFeed;

use super::live_loop::{run_live, LiveRunStats, DEFAULT_IDLE};
use super::pipeline_logger::PipelineLogger;

/// Live annotation: runs every detector on each new camera frame and hands
/// the merged overlay to the feed for display.
pub struct LiveOverlayUseCase {
    detectors: Vec<(String, Box<dyn Detector>)>,
    logger: Box<dyn PipelineLogger>,
    idle: Duration,
}

impl LiveOverlayUseCase {
    pub fn new(
        detectors: Vec<(String, Box<dyn Detector>)>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            detectors,
            logger,
            idle: DEFAULT_IDLE,
        }
    }

    pub fn with_idle(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    /// Runs until the feed stops. Detection errors end the run.
    pub fn execute(
        &mut self,
        feed: &dyn LiveFeed,
    ) -> Result<LiveRunStats, Box<dyn std::error::Error>> {
        let detectors = &mut self.detectors;
        let stats = run_live(feed, self.idle, self.logger.as_mut(), |frame, logger| {
            let mut overlay = Overlay::new();
            for (name, detector) in detectors.iter_mut() {
                let start = Instant::now();
                let result = detector.detect(Some(frame))?;
                logger.timing(name, start.elapsed().as_secs_f64() * 1000.0);
                logger.metric(name, result.len() as f64);
                overlay.add_result(result);
            }
            Ok(overlay)
        })?;
        self.logger.summary();
        Ok(stats)
    }
}
