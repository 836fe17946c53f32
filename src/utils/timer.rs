//! Stage timing

use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Wall-clock timer for a pipeline stage
#[derive(Debug)]
pub struct Timer {
    name: String,
    start: Instant,
    checkpoints: Vec<(String, Duration)>,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            checkpoints: Vec::new(),
        }
    }

    /// Record the elapsed time under `label`
    pub fn checkpoint(&mut self, label: impl Into<String>) {
        let label = label.into();
        let at = self.start.elapsed();
        debug!(timer = %self.name, checkpoint = %label, secs = at.as_secs_f64(), "Checkpoint");
        self.checkpoints.push((label, at));
    }

    pub fn checkpoints(&self) -> &[(String, Duration)] {
        &self.checkpoints
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stop and log the total plus the time between checkpoints
    pub fn stop(self) -> Duration {
        let elapsed = self.start.elapsed();
        let mut prev = Duration::ZERO;
        for (label, at) in &self.checkpoints {
            debug!(timer = %self.name, stage = %label, secs = (*at - prev).as_secs_f64(), "Stage time");
            prev = *at;
        }
        info!(timer = %self.name, secs = elapsed.as_secs_f64(), "Completed");
        elapsed
    }
}
