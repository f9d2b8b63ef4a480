//! Gain-boost distortion with a linear soft knee.

use pb_ir::clamp_distortion;

use super::Effect;
use crate::frame::{clamp_i16, Frame};

/// Amounts below this are treated as off.
const BYPASS_BELOW: f32 = 0.1;
/// Normalised level where the soft knee starts.
const KNEE: f32 = 0.9;
/// Slope above the knee.
const KNEE_SLOPE: f32 = 0.1;

pub struct Distortion {
    amount: f32,
}

impl Distortion {
    pub fn new(amount: f32) -> Self {
        Self {
            amount: clamp_distortion(amount),
        }
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    /// Amount in percent, clamped to 0-100. Takes effect on the next sample.
    pub fn set_amount(&mut self, amount: f32) {
        self.amount = clamp_distortion(amount);
    }

    fn shape(&self, sample: i16) -> i16 {
        let gain = 1.0 + self.amount / 100.0 * 3.0;
        let mut x = sample as f32 / 32768.0 * gain;
        if x > KNEE {
            x = KNEE + (x - KNEE) * KNEE_SLOPE;
        } else if x < -KNEE {
            x = -KNEE + (x + KNEE) * KNEE_SLOPE;
        }
        clamp_i16((x * 32768.0) as i32)
    }
}

impl Effect for Distortion {
    fn process(&mut self, frame: Frame) -> Frame {
        if self.is_bypassed() {
            return frame;
        }
        Frame {
            left: self.shape(frame.left),
            right: self.shape(frame.right),
        }
    }

    fn reset(&mut self) {}

    fn is_bypassed(&self) -> bool {
        self.amount < BYPASS_BELOW
    }
}
