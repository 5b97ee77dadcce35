use ct_audio::AudioError;
use ct_engine::EngineError;
use ct_formats::FormatError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The audio device could not be opened.
    #[error("output sink unavailable: {0}")]
    OutputSinkUnavailable(#[from] AudioError),
    #[error("row {row} out of range (song has {rows})")]
    RowOutOfRange { row: usize, rows: usize },
    #[error("could not start playback thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("playback thread exited before starting")]
    ThreadExited,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("render failed: {0}")]
    Render(#[from] EngineError),
    #[error("encoding failed: {0}")]
    Format(#[from] FormatError),
    #[error("writing the output file failed: {0}")]
    Io(#[from] std::io::Error),
}
