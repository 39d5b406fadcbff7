use crossbeam_channel::Sender;

use sightline_core::pipeline::pipeline_logger::{PipelineLogger, StatsPipelineLogger};

use super::detection_worker::WorkerMessage;

/// Keeps run statistics like the CLI does and mirrors status messages to
/// the window's status line.
pub struct StatusLogger {
    stats: StatsPipelineLogger,
    tx: Sender<WorkerMessage>,
}

impl StatusLogger {
    pub fn new(tx: Sender<WorkerMessage>) -> Self {
        Self {
            stats: StatsPipelineLogger::default(),
            tx,
        }
    }
}

impl PipelineLogger for StatusLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.stats.progress(current, total);
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.stats.timing(stage, duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.stats.metric(name, value);
    }

    fn info(&mut self, message: &str) {
        self.stats.info(message);
        let _ = self.tx.send(WorkerMessage::Status(message.to_string()));
    }

    fn summary(&self) {
        self.stats.summary();
    }
}
