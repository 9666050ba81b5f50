//! Replay scheduling
//!
//! A replay turns a sample list into a stream of `(frame, delay)` steps. The
//! schedule is pure: it never sleeps, so pacing can be tested without a
//! runtime and the connection task only has to execute the steps.

use std::sync::Arc;
use std::time::Duration;

use flowsim_core::FlowSample;

use crate::frame::{FrameIdentity, StatusFrame};

/// Slowest accepted replay speed
pub const MIN_SPEED: f64 = 1e-3;

/// Clamp a speed multiplier to the accepted range
pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() || speed < MIN_SPEED {
        MIN_SPEED
    } else {
        speed
    }
}

/// Convert a simulated interval to wall-clock time at `speed`
pub fn scaled_delay(interval_ms: u64, speed: f64) -> Duration {
    let secs = interval_ms as f64 / clamp_speed(speed) / 1000.0;
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Replay behaviour shared by every connection
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySettings {
    /// Start over after the last sample
    pub repeat: bool,
    /// Speed multiplier, clamped to [`MIN_SPEED`]
    pub speed: f64,
    /// Topic and mainboard id stamped on frames
    pub identity: FrameIdentity,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            repeat: false,
            speed: 1.0,
            identity: FrameIdentity::default(),
        }
    }
}

/// One frame and the wait that follows it
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayStep {
    /// Frame to send now
    pub frame: StatusFrame,
    /// Wait before the next frame, `None` when the replay ends after this one
    pub delay: Option<Duration>,
}

/// Per-connection replay state
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayState {
    /// Ready to send the next scheduled frame
    Sending,
    /// Waiting out the pacing delay before the next frame
    WaitingNextTick(Duration),
    /// Replay finished, a close frame should be sent
    Closing,
    /// Connection finished
    Done,
}

/// Iterator over the steps of one connection's replay
#[derive(Debug, Clone)]
pub struct ReplaySchedule {
    samples: Arc<[FlowSample]>,
    settings: Arc<ReplaySettings>,
    index: usize,
    passes: u64,
    finished: bool,
}

impl ReplaySchedule {
    /// Start a schedule at the first sample
    pub fn new(samples: Arc<[FlowSample]>, settings: Arc<ReplaySettings>) -> Self {
        let finished = samples.is_empty();
        Self {
            samples,
            settings,
            index: 0,
            passes: 0,
            finished,
        }
    }

    /// Completed passes over the sample list
    pub fn passes(&self) -> u64 {
        self.passes
    }

    fn delay_after(&self, index: usize) -> Option<Duration> {
        let current = self.samples[index].timestamp_ms;
        match self.samples.get(index + 1) {
            Some(next) => Some(scaled_delay(
                next.timestamp_ms.saturating_sub(current),
                self.settings.speed,
            )),
            None if self.settings.repeat => Some(scaled_delay(
                self.samples[0].timestamp_ms,
                self.settings.speed,
            )),
            None => None,
        }
    }
}

impl Iterator for ReplaySchedule {
    type Item = ReplayStep;

    fn next(&mut self) -> Option<ReplayStep> {
        if self.finished {
            return None;
        }

        let count = self.samples.len();
        let index = self.index;
        let frame = StatusFrame::for_sample(
            &self.settings.identity,
            index,
            &self.samples[index],
            count,
        );
        let delay = self.delay_after(index);

        if index + 1 < count {
            self.index += 1;
        } else {
            self.passes += 1;
            self.index = 0;
            self.finished = !self.settings.repeat;
        }

        Some(ReplayStep { frame, delay })
    }
}
