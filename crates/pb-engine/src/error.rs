//! Engine error type.

/// Rejected engine or sequencer operation. State is left untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("pad index {0} out of range")]
    InvalidPad(usize),
    #[error("voice index {0} out of range")]
    InvalidVoice(usize),
    #[error("track index {0} out of range")]
    InvalidTrack(usize),
    #[error("pattern index {0} out of range")]
    InvalidPattern(usize),
    #[error("no sample registered on pad {0}")]
    MissingSample(usize),
}
