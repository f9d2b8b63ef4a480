//! Render-time load tracking for the audio thread.
//!
//! The audio thread is the only writer; any thread may read.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// Weight of the newest block in the smoothed figure.
const SMOOTHING: f32 = 0.1;

/// Smoothed render time as a percentage of the block period.
#[derive(Debug)]
pub struct LoadMeter {
    block_ns: u64,
    // f32 bits
    smoothed: AtomicU32,
    peak: AtomicU32,
    blocks: AtomicU64,
}

impl LoadMeter {
    /// Meter for blocks of `block_frames` at `sample_rate`.
    pub fn new(sample_rate: u32, block_frames: usize) -> Self {
        let block_ns = block_frames as u64 * 1_000_000_000 / sample_rate.max(1) as u64;
        Self {
            block_ns: block_ns.max(1),
            smoothed: AtomicU32::new(0f32.to_bits()),
            peak: AtomicU32::new(0f32.to_bits()),
            blocks: AtomicU64::new(0),
        }
    }

    /// Record the time spent rendering one block.
    #[inline]
    pub fn record(&self, render_time: Duration) {
        let load = render_time.as_nanos() as f32 / self.block_ns as f32 * 100.0;
        let previous = f32::from_bits(self.smoothed.load(Ordering::Relaxed));
        let next = if self.blocks.load(Ordering::Relaxed) == 0 {
            load
        } else {
            previous + (load - previous) * SMOOTHING
        };
        self.smoothed.store(next.to_bits(), Ordering::Relaxed);
        if load > f32::from_bits(self.peak.load(Ordering::Relaxed)) {
            self.peak.store(load.to_bits(), Ordering::Relaxed);
        }
        self.blocks.fetch_add(1, Ordering::Relaxed);
    }

    /// Smoothed load in percent. Above 100 means the renderer cannot keep up.
    pub fn percent(&self) -> f32 {
        f32::from_bits(self.smoothed.load(Ordering::Relaxed))
    }

    /// Worst single block since the last reset.
    pub fn peak_percent(&self) -> f32 {
        f32::from_bits(self.peak.load(Ordering::Relaxed))
    }

    pub fn blocks(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.smoothed.store(0f32.to_bits(), Ordering::Relaxed);
        self.peak.store(0f32.to_bits(), Ordering::Relaxed);
        self.blocks.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_block_sets_the_level() {
        // 1000 frames at 1 kHz = 1 s per block.
        let meter = LoadMeter::new(1_000, 1_000);
        meter.record(Duration::from_millis(250));
        assert!((meter.percent() - 25.0).abs() < 0.01);
        assert_eq!(meter.blocks(), 1);
    }

    #[test]
    fn later_blocks_are_smoothed() {
        let meter = LoadMeter::new(1_000, 1_000);
        meter.record(Duration::from_millis(100));
        meter.record(Duration::from_millis(1_100));
        // 10 + (110 - 10) * 0.1
        assert!((meter.percent() - 20.0).abs() < 0.01);
        assert!((meter.peak_percent() - 110.0).abs() < 0.01);
    }

    #[test]
    fn reset_clears_everything() {
        let meter = LoadMeter::new(44_100, 128);
        meter.record(Duration::from_micros(500));
        meter.reset();
        assert_eq!(meter.percent(), 0.0);
        assert_eq!(meter.peak_percent(), 0.0);
        assert_eq!(meter.blocks(), 0);
    }
}
