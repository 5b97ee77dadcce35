//! Audio output backends for ctracker.
//!
//! Live voices write mono PCM into per-slot lanes; the device callback
//! pans and mixes the lanes into the stereo stream.

mod cpal_backend;
mod lanes;
mod traits;

pub use cpal_backend::CpalOutput;
pub use lanes::{lanes, LaneMixer, LaneWriter};
pub use traits::{AudioError, VoiceSink, VoiceSlot, LANES};
