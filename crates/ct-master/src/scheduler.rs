//! Live playback scheduler.
//!
//! Walks the song row by row against the wall clock. Each row cancels
//! the previous row's voices, waits a short grace period, launches one
//! voice per sounding cell and then waits one row duration. A stop
//! request is honoured at the next wait, so playback ends within one row.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use ct_audio::{VoiceSink, VoiceSlot};
use ct_engine::{active_cells, Advance, RowCursor, SampleBank, SampleLoader, VoiceSpec};
use ct_ir::Song;
use tracing::{debug, info, trace};

use crate::config::PlaybackConfig;
use crate::live::{VoiceContext, VoiceTable};

/// Transport state of a playback session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportState {
    Idle,
    Playing,
    Stopped,
}

/// What to play.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayRange {
    /// The whole song from row 0, following the loop window.
    Song,
    /// One row, once.
    Row(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Ran past the last row with looping off (or finished a single row).
    EndOfSong,
    /// A stop was requested.
    Requested,
}

/// Progress notifications, sent in playback order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackEvent {
    RowStarted { row: usize, voices: usize },
    LoopCompleted { iteration: u32 },
    Stopped { reason: StopReason, loops: u32 },
}

/// Outcome of a playback session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub rows_played: usize,
    pub loops: u32,
    pub reason: StopReason,
}

/// Requests an end to playback. Cheap to clone and safe to call from any
/// thread, any number of times.
#[derive(Clone, Debug)]
pub struct StopHandle {
    tx: Sender<()>,
}

impl StopHandle {
    pub(crate) fn new(tx: Sender<()>) -> Self {
        Self { tx }
    }

    pub fn stop(&self) {
        // A full channel means a stop is already pending
        let _ = self.tx.try_send(());
    }
}

pub(crate) struct Scheduler {
    song: Song,
    range: PlayRange,
    config: PlaybackConfig,
    loader: Arc<dyn SampleLoader>,
    events: Sender<PlaybackEvent>,
    stop: Receiver<()>,
    voices: VoiceTable,
    state: TransportState,
}

impl Scheduler {
    pub fn new(
        song: Song,
        range: PlayRange,
        config: PlaybackConfig,
        loader: Arc<dyn SampleLoader>,
        events: Sender<PlaybackEvent>,
        stop: Receiver<()>,
    ) -> Self {
        Self {
            song,
            range,
            config,
            loader,
            events,
            stop,
            voices: VoiceTable::default(),
            state: TransportState::Idle,
        }
    }

    /// Play until the song ends or a stop is requested, then drain.
    pub fn run(mut self, sink: Arc<dyn VoiceSink>) -> PlaybackSummary {
        let ctx = VoiceContext {
            sink,
            bank: Arc::new(Mutex::new(SampleBank::new(self.loader.clone()))),
            write_poll: self.config.write_poll,
        };
        let mut cursor = match self.range {
            PlayRange::Song => RowCursor::new(&self.song),
            PlayRange::Row(row) => RowCursor::single_row(&self.song, row),
        };
        let row_duration = Duration::from_millis(self.song.row_duration_ms().into());
        self.transition(TransportState::Playing);
        info!(
            bpm = self.song.bpm(),
            row_ms = self.song.row_duration_ms(),
            loop_enabled = self.song.loop_window().enabled(),
            "playback started"
        );

        let mut rows_played = 0;
        let reason = loop {
            if self.play_row(cursor.row(), &ctx) {
                break StopReason::Requested;
            }
            rows_played += 1;
            if self.wait(row_duration) {
                break StopReason::Requested;
            }
            match cursor.advance() {
                Advance::Row(_) => {}
                Advance::Wrapped { iteration, .. } => {
                    info!(iteration, "loop");
                    self.emit(PlaybackEvent::LoopCompleted { iteration });
                }
                Advance::End => break StopReason::EndOfSong,
            }
        };

        let loops = cursor.loops();
        self.voices.cancel_all();
        thread::sleep(self.config.drain);
        self.voices.join_all();
        self.transition(TransportState::Stopped);
        info!(?reason, loops, rows_played, "playback stopped");
        self.emit(PlaybackEvent::Stopped { reason, loops });
        PlaybackSummary {
            rows_played,
            loops,
            reason,
        }
    }

    /// Start one row's voices. Returns true if a stop arrived during the
    /// grace period, in which case nothing was launched.
    fn play_row(&mut self, row: usize, ctx: &VoiceContext) -> bool {
        let cancelled = self.voices.cancel_all();
        self.voices.reap();
        if cancelled > 0 {
            debug!(row, cancelled, "cut voices still sounding");
        }
        if self.wait(self.config.start_grace) {
            return true;
        }

        let duration_ms = self.song.row_duration_ms();
        let cells = active_cells(&self.song, row);
        debug!(row, voices = cells.len(), "row");
        self.emit(PlaybackEvent::RowStarted {
            row,
            voices: cells.len(),
        });
        for active in &cells {
            if let Some(spec) = VoiceSpec::for_cell(active.cell, duration_ms) {
                let slot = VoiceSlot::new(active.channel, spec.kind());
                self.voices.activate(slot, spec, ctx);
            }
        }
        false
    }

    /// Sleep for `timeout` unless a stop arrives first. Returns true on stop.
    fn wait(&self, timeout: Duration) -> bool {
        match self.stop.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        // Nobody listening is fine; a full backlog drops the event
        if let Err(TrySendError::Full(event)) = self.events.try_send(event) {
            trace!(?event, "event backlog full");
        }
    }

    fn transition(&mut self, next: TransportState) {
        debug_assert!(
            matches!(
                (self.state, next),
                (TransportState::Idle, TransportState::Playing) | (TransportState::Playing, TransportState::Stopped)
            ),
            "bad transport transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(from = ?self.state, to = ?next, "transport");
        self.state = next;
    }
}
