//! Master effects chain.
//!
//! Four stages in a fixed order: distortion, biquad filter, sample-rate
//! reduction, bit-depth reduction. Each stage keeps its own state across
//! calls and has a bypass setting that makes it a pass-through.

mod biquad;
mod bitcrush;
mod decimator;
mod distortion;

pub use biquad::{Biquad, BiquadCoeffs};
pub use bitcrush::Bitcrusher;
pub use decimator::Decimator;
pub use distortion::Distortion;

use pb_ir::{FilterKind, FxParams, NATIVE_SAMPLE_RATE};

use crate::frame::Frame;

/// A stateful per-frame processor.
pub trait Effect: Send {
    /// Process one stereo frame.
    fn process(&mut self, frame: Frame) -> Frame;

    /// Clear running state (history, held samples). Parameters are kept.
    fn reset(&mut self);

    /// True when `process` currently returns its input unchanged.
    fn is_bypassed(&self) -> bool;
}

/// The global chain applied to the mixed output.
pub struct EffectsChain {
    distortion: Distortion,
    filter: Biquad,
    decimator: Decimator,
    bitcrusher: Bitcrusher,
}

impl EffectsChain {
    /// Chain with default (bypassed) settings at the native rate.
    pub fn new() -> Self {
        Self::with_params(FxParams::default())
    }

    /// Chain configured from `params`, clamped.
    pub fn with_params(params: FxParams) -> Self {
        let params = params.clamped();
        Self {
            distortion: Distortion::new(params.distortion),
            filter: Biquad::new(
                params.filter,
                params.cutoff,
                params.resonance,
                NATIVE_SAMPLE_RATE,
            ),
            decimator: Decimator::new(params.decimate_to, NATIVE_SAMPLE_RATE),
            bitcrusher: Bitcrusher::new(params.bit_depth),
        }
    }

    /// Current settings.
    pub fn params(&self) -> FxParams {
        FxParams {
            filter: self.filter.kind(),
            cutoff: self.filter.cutoff(),
            resonance: self.filter.resonance(),
            bit_depth: self.bitcrusher.depth(),
            distortion: self.distortion.amount(),
            decimate_to: self.decimator.target_rate(),
        }
    }

    pub fn set_filter(&mut self, kind: FilterKind) {
        self.filter.set_kind(kind);
    }

    pub fn set_cutoff(&mut self, hz: f32) {
        self.filter.set_cutoff(hz);
    }

    pub fn set_resonance(&mut self, q: f32) {
        self.filter.set_resonance(q);
    }

    pub fn set_bit_depth(&mut self, bits: u8) {
        self.bitcrusher.set_depth(bits);
    }

    pub fn set_distortion(&mut self, amount: f32) {
        self.distortion.set_amount(amount);
    }

    pub fn set_decimation(&mut self, rate: u32) {
        self.decimator.set_target_rate(rate);
    }

    /// The filter stage, for inspecting coefficients.
    pub fn filter(&self) -> &Biquad {
        &self.filter
    }

    /// Run one frame through every stage.
    #[inline]
    pub fn process_frame(&mut self, frame: Frame) -> Frame {
        let frame = self.distortion.process(frame);
        let frame = self.filter.process(frame);
        let frame = self.decimator.process(frame);
        self.bitcrusher.process(frame)
    }

    /// True when no stage is doing anything.
    pub fn is_bypassed(&self) -> bool {
        self.distortion.is_bypassed()
            && self.filter.is_bypassed()
            && self.decimator.is_bypassed()
            && self.bitcrusher.is_bypassed()
    }
}

impl Default for EffectsChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chain_is_transparent() {
        let mut chain = EffectsChain::new();
        assert!(chain.is_bypassed());
        for v in [-32768i16, -1, 0, 1, 12345, 32767] {
            assert_eq!(chain.process_frame(Frame::mono(v)), Frame::mono(v));
        }
    }

    #[test]
    fn params_reflect_clamped_setters() {
        let mut chain = EffectsChain::new();
        chain.set_filter(FilterKind::HighPass);
        chain.set_cutoff(50_000.0);
        chain.set_resonance(0.0);
        chain.set_bit_depth(2);
        chain.set_distortion(500.0);
        chain.set_decimation(100);
        let p = chain.params();
        assert_eq!(p.filter, FilterKind::HighPass);
        assert_eq!(p.cutoff, 16_000.0);
        assert_eq!(p.resonance, 0.5);
        assert_eq!(p.bit_depth, 4);
        assert_eq!(p.distortion, 100.0);
        assert_eq!(p.decimate_to, 8_000);
    }

    #[test]
    fn crusher_runs_after_distortion() {
        // Distortion output is quantised by the crusher, never the reverse.
        let mut chain = EffectsChain::new();
        chain.set_distortion(50.0);
        chain.set_bit_depth(8);
        let out = chain.process_frame(Frame::mono(1001));
        assert_eq!(out.left & 0xff, 0);
        assert_ne!(out.left, 1001 & !0xff);
    }

    #[test]
    fn decimation_holds_filtered_values() {
        let mut chain = EffectsChain::new();
        chain.set_decimation(22_050);
        let a = chain.process_frame(Frame::mono(100));
        let b = chain.process_frame(Frame::mono(200));
        let c = chain.process_frame(Frame::mono(300));
        assert_eq!(a, Frame::mono(100));
        assert_eq!(b, Frame::mono(100));
        assert_eq!(c, Frame::mono(300));
    }
}
