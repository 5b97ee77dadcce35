//! Voice sink trait and error types.

use ct_engine::VoiceKind;
use ct_ir::MAX_CHANNELS;
use thiserror::Error;

/// Error type for audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Failed to initialize audio device
    #[error("device init error: {0}")]
    DeviceInit(String),
    /// Failed to create audio stream
    #[error("stream create error: {0}")]
    StreamCreate(String),
    /// Playback error
    #[error("playback error: {0}")]
    Playback(String),
    /// No audio device available
    #[error("no audio device available")]
    NoDevice,
    /// Sink plays at a rate other than the engine's
    #[error("sink runs at {0} Hz, engine renders at 44100 Hz")]
    UnsupportedRate(u32),
}

/// Number of independent voice slots: one tone and one sample per channel.
pub const LANES: usize = MAX_CHANNELS * 2;

/// Where a live voice plays: its channel and generator kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoiceSlot {
    pub channel: usize,
    pub kind: VoiceKind,
}

impl VoiceSlot {
    pub const fn new(channel: usize, kind: VoiceKind) -> Self {
        Self { channel, kind }
    }

    /// Index of this slot's lane, `channel * 2 + kind`.
    pub const fn lane(self) -> usize {
        self.channel * 2 + self.kind.index()
    }
}

/// Destination for live voice audio.
///
/// Writes never block: a sink takes what fits and reports how much that
/// was, so the caller can retry after a short wait.
pub trait VoiceSink: Send + Sync {
    /// Sample rate the sink plays at.
    fn sample_rate(&self) -> u32;

    /// Queue mono frames on `slot`. Returns how many were accepted.
    fn write(&self, slot: VoiceSlot, samples: &[i16]) -> usize;

    /// Drop whatever `slot` still has queued.
    fn silence(&self, slot: VoiceSlot);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lanes_are_unique_per_slot() {
        let mut seen = [false; LANES];
        for channel in 0..MAX_CHANNELS {
            for kind in [VoiceKind::Tone, VoiceKind::Sample] {
                let lane = VoiceSlot::new(channel, kind).lane();
                assert!(!seen[lane], "lane {lane} reused");
                seen[lane] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }
}
