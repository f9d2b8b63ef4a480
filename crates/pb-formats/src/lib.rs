//! Sample loading and render export for padbox.
//!
//! Pads play mono 16-bit PCM. WAV is the only container understood.

mod wav_format;

pub use wav_format::{frames_to_wav, load_wav, load_wav_file, write_wav};

use thiserror::Error;

/// Error type for format parsing.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("invalid RIFF/WAVE header")]
    InvalidHeader,
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("unsupported format: {0}")]
    UnsupportedFormat(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
