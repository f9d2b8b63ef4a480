//! Audio output trait and error types.

use pb_engine::Frame;

/// Error type for audio operations.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("device init error: {0}")]
    DeviceInit(String),
    #[error("stream create error: {0}")]
    StreamCreate(String),
    #[error("playback error: {0}")]
    Playback(String),
    #[error("no audio device available")]
    NoDevice,
    #[error("output is not running")]
    NotRunning,
}

/// Destination for rendered blocks.
///
/// `write` is where real-time pacing happens: it blocks until the device
/// has room, so a render loop that alternates render/write runs at exactly
/// the device rate.
pub trait AudioOutput {
    /// Rate the output consumes frames at.
    fn sample_rate(&self) -> u32;

    /// Write frames, blocking until all are accepted.
    fn write(&mut self, frames: &[Frame]) -> Result<(), AudioError>;

    /// Start playback.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop playback.
    fn stop(&mut self) -> Result<(), AudioError>;
}
