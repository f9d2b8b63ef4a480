//! Real-time core of padbox.
//!
//! [`Engine`] mixes the voice pool through the effects chain into stereo
//! blocks; [`Sequencer`] turns elapsed time into pad triggers. The two
//! never reference each other: the controller connects them through the
//! sequencer's callbacks and a command queue.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod capture;
pub mod effects;
mod error;
mod frame;
mod live_loop;
mod mixer;
mod sequencer;
mod voice;
mod voice_pool;

pub use capture::{CaptureRing, Visualization, CAPTURE_LEN, SPECTRUM_BANDS, WAVEFORM_POINTS};
pub use effects::{Effect, EffectsChain};
pub use error::EngineError;
pub use frame::{clamp_i16, Frame};
pub use live_loop::{LiveLoops, LoopState, TrackState};
pub use mixer::{Engine, DEFAULT_MASTER_VOLUME};
pub use sequencer::{Sequencer, StepCallback, Transport, TriggerCallback, DEFAULT_TEMPO};
pub use voice::{SourceGains, Voice};
pub use voice_pool::{VoiceId, VoicePool, STEAL_SLOT};
