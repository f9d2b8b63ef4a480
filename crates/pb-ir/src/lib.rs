//! Shared types for the padbox drum machine.
//!
//! Everything the real-time engine, the sample loader and the controller
//! need to agree on: grid dimensions, patterns, sample handles, effect
//! parameter ranges and the command vocabulary sent to the audio thread.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod command;
mod params;
mod pattern;
mod sample;

pub use command::{Command, TriggerSource};
pub use params::{
    clamp_bit_depth, clamp_cutoff, clamp_decimation, clamp_distortion, clamp_pitch,
    clamp_resonance, clamp_tempo, clamp_volume, FilterKind, FxParams,
};
pub use pattern::{Cell, Pattern};
pub use sample::SampleBuffer;

/// Number of sample pads.
pub const NUM_PADS: usize = 16;
/// Number of sequencer tracks. Track `i` plays pad `i`.
pub const NUM_TRACKS: usize = 16;
/// Steps in one pattern.
pub const STEPS_PER_PATTERN: usize = 16;
/// Pattern slots held by the sequencer.
pub const NUM_PATTERNS: usize = 16;
/// Sixteenth-note grid.
pub const STEPS_PER_BEAT: u32 = 4;
/// Concurrent playback voices.
pub const MAX_VOICES: usize = 16;
/// Rate the engine renders at; decimation targets are relative to it.
pub const NATIVE_SAMPLE_RATE: u32 = 44_100;
/// Default render block size in frames.
pub const BLOCK_FRAMES: usize = 128;
/// Largest block the engine renders in one pass.
pub const MAX_BLOCK_FRAMES: usize = 1024;
/// Highest MIDI-style velocity.
pub const MAX_VELOCITY: u8 = 127;

/// Display names for the sixteen tracks, used in diagnostics.
pub const TRACK_NAMES: [&str; NUM_TRACKS] = [
    "Kick", "Snare", "Closed Hat", "Open Hat", "Clap", "Tom Hi", "Tom Lo", "Crash", "Ride",
    "Rim", "Cowbell", "Shaker", "Perc 1", "Perc 2", "FX 1", "FX 2",
];
