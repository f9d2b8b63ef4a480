//! Output that discards audio at real-time pace.
//!
//! Useful on machines without a sound card and for soak-testing the
//! control loop: the render thread is paced exactly as it would be by a
//! device, but nothing is played.

use pb_engine::Frame;
use std::time::{Duration, Instant};

use crate::traits::{AudioError, AudioOutput};

/// Clock-paced sink.
pub struct NullOutput {
    sample_rate: u32,
    running: bool,
    started: Option<Instant>,
    frames_written: u64,
}

impl NullOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            running: false,
            started: None,
            frames_written: 0,
        }
    }

    /// Frames accepted since `start`.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl AudioOutput for NullOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn write(&mut self, frames: &[Frame]) -> Result<(), AudioError> {
        if !self.running {
            return Err(AudioError::NotRunning);
        }
        let started = *self.started.get_or_insert_with(Instant::now);
        self.frames_written += frames.len() as u64;
        let due = Duration::from_micros(self.frames_written * 1_000_000 / self.sample_rate as u64);
        if let Some(wait) = due.checked_sub(started.elapsed()) {
            std::thread::sleep(wait);
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running = true;
        self.started = None;
        self.frames_written = 0;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running = false;
        Ok(())
    }
}
