//! Headless controller for ctracker.
//!
//! Owns a song and exposes live playback, single-row preview and
//! offline WAV export, shared by the CLI and the integration tests.

mod config;
mod error;
mod export;
mod live;
mod scheduler;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use ct_audio::CpalOutput;
use tracing::{debug, info, warn};

// Re-export common types so callers don't need the lower crates directly.
pub use ct_audio::{AudioError, VoiceSink, VoiceSlot};
pub use ct_engine::{AssetError, EngineError, Frame, MemoryLoader, RenderReport, Rendered, SampleLoader, VoiceKind};
pub use ct_formats::{FormatError, WavLoader};
pub use ct_ir::{
    Cell, LoopWindow, Note, Sample, Song, SongError, BPM_RANGE, DEFAULT_BPM, DEFAULT_ORIGINAL_NOTE, DEFAULT_ROWS,
    MAX_CHANNELS, SAMPLE_RATE,
};

pub use config::PlaybackConfig;
pub use error::{ExportError, PlaybackError};
pub use export::write_wav_file;
pub use scheduler::{PlayRange, PlaybackEvent, PlaybackSummary, StopHandle, StopReason, TransportState};

use scheduler::Scheduler;

/// Headless tracker controller: owns a song and manages playback.
pub struct Controller {
    song: Song,
    loader: Arc<dyn SampleLoader>,
    config: PlaybackConfig,
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    stop: StopHandle,
    events: Receiver<PlaybackEvent>,
    finished: Arc<AtomicBool>,
    thread: Option<JoinHandle<Option<PlaybackSummary>>>,
}

impl Controller {
    /// A controller with an empty default song whose samples come from
    /// `loader`.
    pub fn new(loader: Arc<dyn SampleLoader>) -> Self {
        Self {
            song: Song::default(),
            loader,
            config: PlaybackConfig::default(),
            playback: None,
        }
    }

    pub fn with_config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    // --- Song management ---

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Edit the song. Playback is stopped first; a session always plays
    /// its own snapshot.
    pub fn song_mut(&mut self) -> &mut Song {
        self.stop();
        &mut self.song
    }

    pub fn set_song(&mut self, song: Song) {
        self.stop();
        self.song = song;
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    // --- Real-time playback ---

    /// Play the song on the default audio device.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        self.start(PlayRange::Song, None)
    }

    /// Play one row once on the default audio device.
    pub fn play_row(&mut self, row: usize) -> Result<(), PlaybackError> {
        self.start(PlayRange::Row(row), None)
    }

    /// Play into a caller-supplied sink instead of the audio device.
    pub fn play_with_sink(&mut self, range: PlayRange, sink: Arc<dyn VoiceSink>) -> Result<(), PlaybackError> {
        self.start(range, Some(sink))
    }

    fn start(&mut self, range: PlayRange, sink: Option<Arc<dyn VoiceSink>>) -> Result<(), PlaybackError> {
        self.stop();
        if let PlayRange::Row(row) = range {
            let rows = self.song.row_count();
            if row >= rows {
                return Err(PlaybackError::RowOutOfRange { row, rows });
            }
        }

        let (stop_tx, stop_rx) = bounded(1);
        let (event_tx, event_rx) = bounded(self.config.event_backlog.max(1));
        let (ready_tx, ready_rx) = bounded(1);
        let finished = Arc::new(AtomicBool::new(false));

        let scheduler = Scheduler::new(
            self.song.clone(),
            range,
            self.config.clone(),
            self.loader.clone(),
            event_tx,
            stop_rx,
        );
        let lane_capacity = self.config.lane_capacity();
        let done = finished.clone();
        let thread = thread::Builder::new()
            .name("ct-playback".into())
            .spawn(move || playback_thread(scheduler, sink, lane_capacity, ready_tx, done))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = thread.join();
                return Err(PlaybackError::OutputSinkUnavailable(err));
            }
            Err(_) => {
                let _ = thread.join();
                return Err(PlaybackError::ThreadExited);
            }
        }

        self.playback = Some(PlaybackHandle {
            stop: StopHandle::new(stop_tx),
            events: event_rx,
            finished,
            thread: Some(thread),
        });
        Ok(())
    }

    /// Request a stop and wait for playback to drain. Returns the
    /// session's summary, or None if nothing was playing.
    pub fn stop(&mut self) -> Option<PlaybackSummary> {
        let pb = self.playback.take()?;
        pb.stop.stop();
        join_playback(pb)
    }

    /// Wait for playback to end on its own.
    pub fn wait(&mut self) -> Option<PlaybackSummary> {
        join_playback(self.playback.take()?)
    }

    /// A handle that can stop the current session from another thread.
    pub fn stop_handle(&self) -> Option<StopHandle> {
        self.playback.as_ref().map(|p| p.stop.clone())
    }

    /// Receiver for the current session's events.
    pub fn events(&self) -> Option<Receiver<PlaybackEvent>> {
        self.playback.as_ref().map(|p| p.events.clone())
    }

    pub fn state(&self) -> TransportState {
        match &self.playback {
            None => TransportState::Idle,
            Some(p) if p.finished.load(Ordering::Acquire) => TransportState::Stopped,
            Some(_) => TransportState::Playing,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state() == TransportState::Playing
    }

    // --- Offline rendering ---

    /// Render the song offline (looping songs play the loop body four
    /// times).
    pub fn render(&self) -> Result<Rendered, EngineError> {
        ct_engine::Renderer::new(self.loader.clone()).render(&self.song)
    }

    pub fn render_to_wav(&self) -> Result<Vec<u8>, ExportError> {
        let rendered = self.render()?;
        Ok(ct_formats::frames_to_wav(&rendered.frames, SAMPLE_RATE)?)
    }

    /// Render and write a WAV file. Nothing is created if rendering fails.
    pub fn export_wav(&self, path: &Path) -> Result<RenderReport, ExportError> {
        let rendered = self.render()?;
        write_wav_file(path, &rendered.frames)?;
        info!(
            path = %path.display(),
            frames = rendered.report.frames,
            seconds = rendered.report.seconds(),
            "exported"
        );
        Ok(rendered.report)
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn join_playback(mut pb: PlaybackHandle) -> Option<PlaybackSummary> {
    let handle = pb.thread.take()?;
    match handle.join() {
        Ok(summary) => summary,
        Err(_) => {
            warn!("playback thread panicked");
            None
        }
    }
}

/// Body of the playback thread. The audio device is opened here so the
/// stream lives and dies on this thread.
fn playback_thread(
    scheduler: Scheduler,
    sink: Option<Arc<dyn VoiceSink>>,
    lane_capacity: usize,
    ready: Sender<Result<(), AudioError>>,
    finished: Arc<AtomicBool>,
) -> Option<PlaybackSummary> {
    let mut device = None;
    let sink = match sink {
        Some(sink) => sink,
        None => match CpalOutput::open(lane_capacity) {
            Ok(output) => {
                debug!(sample_rate = output.sample_rate(), "output device ready");
                let sink = output.sink();
                device = Some(output);
                sink
            }
            Err(err) => {
                finished.store(true, Ordering::Release);
                let _ = ready.send(Err(err));
                return None;
            }
        },
    };
    let rate = sink.sample_rate();
    if rate != SAMPLE_RATE {
        finished.store(true, Ordering::Release);
        let _ = ready.send(Err(AudioError::UnsupportedRate(rate)));
        return None;
    }
    let _ = ready.send(Ok(()));

    let summary = scheduler.run(sink);
    if let Some(mut output) = device {
        if let Err(err) = output.stop() {
            warn!(%err, "failed to pause output stream");
        }
    }
    finished.store(true, Ordering::Release);
    Some(summary)
}
