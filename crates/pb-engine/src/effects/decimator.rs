//! Sample-rate reduction by zero-order hold.

use pb_ir::clamp_decimation;

use super::Effect;
use crate::frame::Frame;

/// Holds every `native / target`-th frame and repeats it in between.
pub struct Decimator {
    native_rate: u32,
    target_rate: u32,
    factor: u32,
    counter: u32,
    held: Frame,
}

impl Decimator {
    pub fn new(target_rate: u32, native_rate: u32) -> Self {
        let mut d = Self {
            native_rate,
            target_rate: native_rate,
            factor: 1,
            counter: 0,
            held: Frame::silence(),
        };
        d.set_target_rate(target_rate);
        d
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    /// Target rate in Hz, clamped to 8000-44100. The hold counter keeps
    /// running across changes.
    pub fn set_target_rate(&mut self, rate: u32) {
        self.target_rate = clamp_decimation(rate);
        self.factor = (self.native_rate / self.target_rate).max(1);
    }
}

impl Effect for Decimator {
    fn process(&mut self, frame: Frame) -> Frame {
        if self.is_bypassed() {
            return frame;
        }
        if self.counter == 0 {
            self.held = frame;
        }
        self.counter += 1;
        if self.counter >= self.factor {
            self.counter = 0;
        }
        self.held
    }

    fn reset(&mut self) {
        self.counter = 0;
        self.held = Frame::silence();
    }

    fn is_bypassed(&self) -> bool {
        self.target_rate >= self.native_rate
    }
}
