//! Effect and mixer parameter ranges.
//!
//! Every setter on the control side funnels through these clamps, so the
//! engine never sees an out-of-range value.

use core::ops::RangeInclusive;

/// Filter response of the global biquad.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FilterKind {
    #[default]
    None,
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

impl FilterKind {
    /// All kinds, in control-surface order.
    pub const ALL: [FilterKind; 5] = [
        FilterKind::None,
        FilterKind::LowPass,
        FilterKind::HighPass,
        FilterKind::BandPass,
        FilterKind::Notch,
    ];

    /// Look up a kind by its control-surface index (0 = none).
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

pub const CUTOFF_RANGE: RangeInclusive<f32> = 100.0..=16_000.0;
pub const RESONANCE_RANGE: RangeInclusive<f32> = 0.5..=20.0;
pub const BIT_DEPTH_RANGE: RangeInclusive<u8> = 4..=16;
pub const DISTORTION_RANGE: RangeInclusive<f32> = 0.0..=100.0;
pub const DECIMATION_RANGE: RangeInclusive<u32> = 8_000..=44_100;
pub const TEMPO_RANGE: RangeInclusive<f32> = 30.0..=300.0;
pub const PITCH_RANGE: RangeInclusive<f32> = 0.25..=4.0;

fn clamp_f32(value: f32, range: RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        return *range.start();
    }
    value.clamp(*range.start(), *range.end())
}

/// Filter cutoff in Hz.
pub fn clamp_cutoff(hz: f32) -> f32 {
    clamp_f32(hz, CUTOFF_RANGE)
}

/// Filter Q.
pub fn clamp_resonance(q: f32) -> f32 {
    clamp_f32(q, RESONANCE_RANGE)
}

/// Bit-crusher depth.
pub fn clamp_bit_depth(bits: u8) -> u8 {
    bits.clamp(*BIT_DEPTH_RANGE.start(), *BIT_DEPTH_RANGE.end())
}

/// Distortion amount, percent.
pub fn clamp_distortion(amount: f32) -> f32 {
    clamp_f32(amount, DISTORTION_RANGE)
}

/// Decimation target rate in Hz.
pub fn clamp_decimation(rate: u32) -> u32 {
    rate.clamp(*DECIMATION_RANGE.start(), *DECIMATION_RANGE.end())
}

/// Any of the 0-100 volume controls.
pub fn clamp_volume(volume: u8) -> u8 {
    volume.min(100)
}

/// Sequencer tempo in BPM.
pub fn clamp_tempo(bpm: f32) -> f32 {
    clamp_f32(bpm, TEMPO_RANGE)
}

/// Reserved playback-rate ratio.
pub fn clamp_pitch(ratio: f32) -> f32 {
    if ratio.is_nan() {
        return 1.0;
    }
    ratio.clamp(*PITCH_RANGE.start(), *PITCH_RANGE.end())
}

/// Full effects-chain settings.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FxParams {
    pub filter: FilterKind,
    /// Hz, 100-16000.
    pub cutoff: f32,
    /// Q, 0.5-20.
    pub resonance: f32,
    /// 4-16; 16 bypasses the crusher.
    pub bit_depth: u8,
    /// 0-100; below 0.1 bypasses distortion.
    pub distortion: f32,
    /// Hz, 8000-44100; the native rate bypasses decimation.
    pub decimate_to: u32,
}

impl FxParams {
    /// Copy with every field pulled into range.
    pub fn clamped(self) -> Self {
        Self {
            filter: self.filter,
            cutoff: clamp_cutoff(self.cutoff),
            resonance: clamp_resonance(self.resonance),
            bit_depth: clamp_bit_depth(self.bit_depth),
            distortion: clamp_distortion(self.distortion),
            decimate_to: clamp_decimation(self.decimate_to),
        }
    }
}

impl Default for FxParams {
    fn default() -> Self {
        Self {
            filter: FilterKind::None,
            cutoff: 8000.0,
            resonance: 1.0,
            bit_depth: 16,
            distortion: 0.0,
            decimate_to: crate::NATIVE_SAMPLE_RATE,
        }
    }
}
