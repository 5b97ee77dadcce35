use std::time::Duration;

use ct_ir::row_frames;

/// Timing knobs for live playback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Pause between cancelling the previous row's voices and starting
    /// the next row's.
    pub start_grace: Duration,
    /// How long stopped voices get to fade out before playback reports
    /// it has stopped.
    pub drain: Duration,
    /// Wait between retries when an output lane is full.
    pub write_poll: Duration,
    /// Per-lane output buffer, in milliseconds of audio.
    pub lane_ms: u32,
    /// Events kept for a slow or absent listener. Newer events are
    /// dropped once this many are waiting.
    pub event_backlog: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            start_grace: Duration::from_millis(10),
            drain: Duration::from_millis(100),
            write_poll: Duration::from_millis(5),
            lane_ms: 100,
            event_backlog: 1024,
        }
    }
}

impl PlaybackConfig {
    /// Lane capacity in frames at the engine rate.
    pub fn lane_capacity(&self) -> usize {
        row_frames(self.lane_ms)
    }
}
