use std::time::{Duration, Instant};

use crate::detection::domain::segmentation_detector::SegmentationDetector;
use crate::overlay::annotations::Overlay;
use crate::source::domain::live_feed::LiveFeed;

use super::live_loop::{run_live, LiveRunStats, DEFAULT_IDLE};
use super::pipeline_logger::PipelineLogger;

/// Live background replacement: each new camera frame is composited over
/// the detector's background and presented in place of the raw frame.
pub struct LiveBackgroundUseCase {
    detector: SegmentationDetector,
    logger: Box<dyn PipelineLogger>,
    idle: Duration,
}

impl LiveBackgroundUseCase {
    pub fn new(detector: SegmentationDetector, logger: Box<dyn PipelineLogger>) -> Self {
        Self {
            detector,
            logger,
            idle: DEFAULT_IDLE,
        }
    }

    pub fn with_idle(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    pub fn execute(
        &mut self,
        feed: &dyn LiveFeed,
    ) -> Result<LiveRunStats, Box<dyn std::error::Error>> {
        let detector = &mut self.detector;
        let stats = run_live(feed, self.idle, self.logger.as_mut(), |frame, logger| {
            let start = Instant::now();
            let composite = detector.composite(Some(frame))?;
            logger.timing("segmentation", start.elapsed().as_secs_f64() * 1000.0);
            Ok(Overlay::new().with_replacement(composite))
        })?;
        self.logger.summary();
        Ok(stats)
    }
}
