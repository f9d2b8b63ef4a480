//! Headless controller for padbox.
//!
//! Wires the sequencer to the engine, runs the audio and control threads,
//! and offers an offline render path that both the CLI and the tests share.

mod config;
mod controller;
mod load_meter;
mod presets;
mod runtime;
mod thread_priority;

pub use config::{Config, ConfigError};
pub use controller::{Controller, ControllerError, EngineStats, COMMAND_QUEUE_LEN};
pub use load_meter::LoadMeter;
pub use presets::{PatternCycle, Preset, PRESETS};
pub use runtime::{CONTROL_TICK, STATUS_INTERVAL};

// Re-export common types so callers don't need pb-ir/pb-engine directly.
pub use pb_audio::{AudioError, AudioOutput, CpalOutput, NullOutput};
pub use pb_engine::{Frame, LoopState, Visualization};
pub use pb_formats::FormatError;
pub use pb_ir::{FilterKind, FxParams, Pattern, SampleBuffer, NUM_PADS, NUM_PATTERNS, TRACK_NAMES};
