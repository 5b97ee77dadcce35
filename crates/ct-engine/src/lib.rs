//! Rendering engine for the ctracker step sequencer.
//!
//! Turns cells into audio: pitch-shifts samples, synthesizes tones,
//! mixes a row's voices into a stereo buffer and replays a whole song
//! offline. The live scheduler in `ct-master` drives the same voices
//! against the wall clock.

mod bank;
mod error;
mod frame;
mod mixer;
mod renderer;
mod resampler;
pub mod sequencer;
mod voice;

pub use bank::{MemoryLoader, SampleBank, SampleKey, SampleLoader};
pub use error::{AssetError, EngineError, Result};
pub use frame::Frame;
pub use mixer::{active_cells, mix_into, mix_row, mix_voice, pan_gains, silent_buffer, ActiveCell, RowCells, RowMix};
pub use renderer::{render_plan, RenderReport, Rendered, Renderer, OFFLINE_LOOP_PASSES};
pub use resampler::{conform_rate, resample, Resampled, MAX_PITCH_RATIO, MIN_PITCH_RATIO};
pub use sequencer::{Advance, RowCursor};
pub use voice::{render_tone, RenderMode, Voice, VoiceKind, VoiceOutput, VoiceSpec};
