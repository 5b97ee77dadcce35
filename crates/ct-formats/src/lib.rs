//! File formats for ctracker.
//!
//! Encodes rendered songs as 16-bit stereo WAV and decodes WAV sample
//! assets into mono PCM.

mod loader;
mod wav_format;

pub use loader::WavLoader;
pub use wav_format::{frames_to_wav, load_wav, write_wav, WAV_HEADER_LEN};

use thiserror::Error;

/// Error type for format parsing and encoding.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Invalid file header or magic bytes
    #[error("invalid WAV header")]
    InvalidHeader,
    /// Unexpected end of file
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// PCM layout we cannot decode
    #[error("unsupported WAV layout: format {format}, {channels} channels, {bits} bits")]
    Unsupported { format: u16, channels: u16, bits: u16 },
    /// Too much audio for a single RIFF file
    #[error("{frames} frames exceed the 4 GiB WAV limit")]
    TooLong { frames: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
