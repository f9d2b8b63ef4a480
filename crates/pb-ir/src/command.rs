//! Messages from the control side to the audio thread.

use crate::params::FilterKind;
use crate::sample::SampleBuffer;

/// Who asked for a trigger. Each source has its own volume in the mixer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerSource {
    /// Fired by the step sequencer.
    Sequencer,
    /// Fired directly from a pad.
    Live,
}

/// One engine mutation, applied at the start of the next render block.
///
/// Values are expected to be clamped already; the engine clamps again
/// anyway so a stray command can never push it out of range.
#[derive(Clone, Debug)]
pub enum Command {
    /// Start a voice on `pad`. With `looped` the voice sustains over the
    /// whole buffer until stopped.
    Trigger {
        pad: u8,
        velocity: u8,
        source: TriggerSource,
        looped: bool,
    },
    /// Silence every voice playing `pad`.
    Stop { pad: u8 },
    /// Silence everything.
    StopAll,
    /// Configure the loop of one voice. `end == 0` loops to the end.
    SetLoop {
        voice: usize,
        enabled: bool,
        start: u32,
        end: u32,
    },
    /// Store the (reserved) pitch ratio of one voice.
    SetPitch { voice: usize, ratio: f32 },
    /// Bind a buffer to a pad, replacing whatever was there.
    Register { pad: u8, buffer: SampleBuffer },
    /// Clear a pad.
    Unregister { pad: u8 },
    SetFilter(FilterKind),
    SetCutoff(f32),
    SetResonance(f32),
    SetBitDepth(u8),
    SetDistortion(f32),
    SetDecimation(u32),
    SetMasterVolume(u8),
    SetSourceVolume { source: TriggerSource, volume: u8 },
}
