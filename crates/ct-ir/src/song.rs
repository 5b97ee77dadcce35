//! Song structure, timing and edit-time validation.

use alloc::vec::Vec;
use core::ops::RangeInclusive;
use arrayvec::ArrayString;
use thiserror::Error;

use crate::pattern::{Cell, Note, Track};

/// Engine sample rate in Hz. Everything is rendered at this rate.
pub const SAMPLE_RATE: u32 = 44_100;

/// Maximum number of channels (tracks) in a song.
pub const MAX_CHANNELS: usize = 8;

/// Rows in a freshly created song.
pub const DEFAULT_ROWS: usize = 16;

/// Tempo of a freshly created song.
pub const DEFAULT_BPM: u32 = 120;

/// Tempos accepted by [`Song::set_bpm`].
pub const BPM_RANGE: RangeInclusive<u32> = 20..=300;

/// Row duration used when the tempo is zero.
const ZERO_BPM_ROW_MS: u32 = 500;

/// Rows per beat (one row is a sixteenth note at 4/4).
const ROWS_PER_BEAT: u32 = 4;

/// Duration of one row in milliseconds: `(60000 / bpm) / 4`, with
/// a 500 ms fallback for a zero tempo.
pub const fn row_duration_ms(bpm: u32) -> u32 {
    if bpm == 0 {
        return ZERO_BPM_ROW_MS;
    }
    (60_000 / bpm) / ROWS_PER_BEAT
}

/// Number of frames at [`SAMPLE_RATE`] covering `duration_ms`.
pub const fn row_frames(duration_ms: u32) -> usize {
    (duration_ms as u64 * SAMPLE_RATE as u64 / 1000) as usize
}

/// Errors raised while editing a song. A song that made it through
/// these checks always satisfies the loop invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SongError {
    #[error("invalid loop range {start}..={end} for a song of {rows} rows")]
    InvalidLoopRange { start: usize, end: usize, rows: usize },
    #[error("tempo {0} BPM is outside 20-300")]
    BpmOutOfRange(u32),
    #[error("a song needs 1-{max} channels, got {requested}")]
    ChannelCount { requested: usize, max: usize },
    #[error("a song needs at least one row")]
    NoRows,
    #[error("channel {channel} out of range (song has {channels})")]
    ChannelOutOfRange { channel: usize, channels: usize },
    #[error("row {row} out of range (song has {rows})")]
    RowOutOfRange { row: usize, rows: usize },
    #[error("MIDI note {0} is outside 0-127")]
    NoteOutOfRange(u8),
    #[error("asset reference of {len} bytes exceeds the 64-byte limit")]
    AssetRefTooLong { len: usize },
}

/// Inclusive row range repeated while looping is enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopWindow {
    enabled: bool,
    start: usize,
    end: usize,
}

impl LoopWindow {
    /// A disabled window spanning `rows` rows.
    pub const fn disabled(rows: usize) -> Self {
        Self {
            enabled: false,
            start: 0,
            end: rows.saturating_sub(1),
        }
    }

    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn end(&self) -> usize {
        self.end
    }

    /// Rows in one pass of the loop body.
    pub const fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// A complete song: channels of fixed-length tracks, a tempo and a loop window.
#[derive(Clone, Debug, PartialEq)]
pub struct Song {
    /// Song title
    pub title: ArrayString<32>,
    bpm: u32,
    rows: usize,
    tracks: Vec<Track>,
    loop_window: LoopWindow,
}

impl Default for Song {
    fn default() -> Self {
        let mut song = Self {
            title: ArrayString::new(),
            bpm: DEFAULT_BPM,
            rows: DEFAULT_ROWS,
            tracks: (0..MAX_CHANNELS).map(|_| Track::new(DEFAULT_ROWS)).collect(),
            loop_window: LoopWindow::disabled(DEFAULT_ROWS),
        };
        song.refresh_durations();
        song
    }
}

impl Song {
    /// Create an empty song with `channels` tracks of `rows` cells.
    pub fn new(channels: usize, rows: usize) -> Result<Self, SongError> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(SongError::ChannelCount {
                requested: channels,
                max: MAX_CHANNELS,
            });
        }
        if rows == 0 {
            return Err(SongError::NoRows);
        }
        let mut song = Self {
            title: ArrayString::new(),
            bpm: DEFAULT_BPM,
            rows,
            tracks: (0..channels).map(|_| Track::new(rows)).collect(),
            loop_window: LoopWindow::disabled(rows),
        };
        song.refresh_durations();
        Ok(song)
    }

    /// Set the title, truncating at the title capacity.
    pub fn set_title(&mut self, title: &str) {
        self.title.clear();
        for ch in title.chars() {
            if self.title.try_push(ch).is_err() {
                break;
            }
        }
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn channels(&self) -> usize {
        self.tracks.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn loop_window(&self) -> LoopWindow {
        self.loop_window
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Duration of one row at the current tempo.
    pub fn row_duration_ms(&self) -> u32 {
        row_duration_ms(self.bpm)
    }

    /// Frames per row at the current tempo.
    pub fn row_frames(&self) -> usize {
        row_frames(self.row_duration_ms())
    }

    pub fn cell(&self, channel: usize, row: usize) -> Option<&Cell> {
        self.tracks.get(channel)?.cell(row)
    }

    /// Iterate `(channel, cell)` over every channel at `row`.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, &Cell)> + '_ {
        self.tracks
            .iter()
            .enumerate()
            .filter_map(move |(ch, track)| track.cell(row).map(|cell| (ch, cell)))
    }

    /// Replace a cell. Its notes are checked against MIDI range and its
    /// duration is re-derived from the song's tempo.
    pub fn set_cell(&mut self, channel: usize, row: usize, mut cell: Cell) -> Result<(), SongError> {
        cell.validate()?;
        cell.set_duration_ms(self.row_duration_ms());
        *self.cell_slot(channel, row)? = cell;
        Ok(())
    }

    /// Put a synthesized tone at a cell. MIDI 0 writes a rest.
    pub fn set_tone(&mut self, channel: usize, row: usize, midi: u8) -> Result<(), SongError> {
        let note = Note::from_midi(midi).ok_or(SongError::NoteOutOfRange(midi))?;
        self.set_cell(channel, row, Cell::tone(note))
    }

    /// Attach a sample recorded at `original_midi` and play it at `midi`.
    pub fn set_sample(
        &mut self,
        channel: usize,
        row: usize,
        midi: u8,
        asset: &str,
        original_midi: u8,
    ) -> Result<(), SongError> {
        let note = Note::from_midi(midi).ok_or(SongError::NoteOutOfRange(midi))?;
        let original = Note::from_midi(original_midi).ok_or(SongError::NoteOutOfRange(original_midi))?;
        let cell = Cell::sampled(note, asset, original)?;
        self.set_cell(channel, row, cell)
    }

    /// Reset a cell to a rest.
    pub fn clear_cell(&mut self, channel: usize, row: usize) -> Result<(), SongError> {
        self.set_cell(channel, row, Cell::empty())
    }

    /// Change the tempo and re-derive every cell's cached duration.
    pub fn set_bpm(&mut self, bpm: u32) -> Result<(), SongError> {
        if !BPM_RANGE.contains(&bpm) {
            return Err(SongError::BpmOutOfRange(bpm));
        }
        self.bpm = bpm;
        self.refresh_durations();
        Ok(())
    }

    /// Enable looping over `start..=end`.
    ///
    /// An invalid range disables the loop and is reported as
    /// [`SongError::InvalidLoopRange`].
    pub fn set_loop(&mut self, start: usize, end: usize) -> Result<(), SongError> {
        if start >= end || end >= self.rows {
            self.loop_window.enabled = false;
            return Err(SongError::InvalidLoopRange {
                start,
                end,
                rows: self.rows,
            });
        }
        self.loop_window = LoopWindow {
            enabled: true,
            start,
            end,
        };
        Ok(())
    }

    /// Turn looping off, keeping the last window for display.
    pub fn disable_loop(&mut self) {
        self.loop_window.enabled = false;
    }

    fn cell_slot(&mut self, channel: usize, row: usize) -> Result<&mut Cell, SongError> {
        let channels = self.tracks.len();
        let rows = self.rows;
        let track = self
            .tracks
            .get_mut(channel)
            .ok_or(SongError::ChannelOutOfRange { channel, channels })?;
        track
            .cell_mut(row)
            .ok_or(SongError::RowOutOfRange { row, rows })
    }

    fn refresh_durations(&mut self) {
        let duration = self.row_duration_ms();
        for track in &mut self.tracks {
            for cell in track.cells_mut() {
                cell.set_duration_ms(duration);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_duration_at_120_bpm() {
        assert_eq!(row_duration_ms(120), 125);
    }

    #[test]
    fn zero_bpm_guard() {
        assert_eq!(row_duration_ms(0), 500);
    }

    #[test]
    fn row_frames_truncate() {
        // 125 ms * 44.1 = 5512.5
        assert_eq!(row_frames(125), 5512);
        assert_eq!(row_frames(500), 22050);
    }

    #[test]
    fn default_song_shape() {
        let song = Song::default();
        assert_eq!(song.channels(), MAX_CHANNELS);
        assert_eq!(song.row_count(), DEFAULT_ROWS);
        assert_eq!(song.bpm(), DEFAULT_BPM);
        assert!(!song.loop_window().enabled());
        assert_eq!(song.loop_window().end(), DEFAULT_ROWS - 1);
        assert_eq!(song.cell(3, 7).unwrap().duration_ms(), 125);
    }

    #[test]
    fn channel_count_validated() {
        assert!(matches!(Song::new(0, 16), Err(SongError::ChannelCount { .. })));
        assert!(matches!(Song::new(9, 16), Err(SongError::ChannelCount { .. })));
        assert_eq!(Song::new(4, 0), Err(SongError::NoRows));
    }

    #[test]
    fn set_bpm_refreshes_every_cell() {
        let mut song = Song::new(2, 4).unwrap();
        song.set_tone(1, 2, 69).unwrap();
        song.set_bpm(60).unwrap();
        for (_, cell) in song.row(2) {
            assert_eq!(cell.duration_ms(), 250);
        }
        assert_eq!(song.cell(0, 0).unwrap().duration_ms(), 250);
    }

    #[test]
    fn set_bpm_rejects_out_of_range() {
        let mut song = Song::default();
        assert_eq!(song.set_bpm(10), Err(SongError::BpmOutOfRange(10)));
        assert_eq!(song.set_bpm(301), Err(SongError::BpmOutOfRange(301)));
        assert_eq!(song.bpm(), DEFAULT_BPM);
    }

    #[test]
    fn set_loop_validates_range() {
        let mut song = Song::new(1, 8).unwrap();
        song.set_loop(2, 5).unwrap();
        let window = song.loop_window();
        assert!(window.enabled());
        assert_eq!((window.start(), window.end(), window.len()), (2, 5, 4));

        assert!(matches!(
            song.set_loop(5, 5),
            Err(SongError::InvalidLoopRange { .. })
        ));
        assert!(!song.loop_window().enabled());

        assert!(song.set_loop(0, 8).is_err());
        assert!(song.set_loop(0, 7).is_ok());
    }

    #[test]
    fn set_sample_derives_ratio() {
        let mut song = Song::default();
        song.set_sample(0, 0, 48, "bass.wav", 60).unwrap();
        let cell = song.cell(0, 0).unwrap();
        assert!((cell.pitch_ratio() - 0.5).abs() < 1e-9);
        assert_eq!(cell.sample(), Some("bass.wav"));
        assert_eq!(cell.duration_ms(), 125);
    }

    #[test]
    fn out_of_range_edits_rejected() {
        let mut song = Song::new(2, 4).unwrap();
        assert!(matches!(
            song.set_tone(2, 0, 60),
            Err(SongError::ChannelOutOfRange { channel: 2, channels: 2 })
        ));
        assert!(matches!(
            song.set_tone(0, 4, 60),
            Err(SongError::RowOutOfRange { row: 4, rows: 4 })
        ));
        assert_eq!(song.set_tone(0, 0, 200), Err(SongError::NoteOutOfRange(200)));
    }

    #[test]
    fn set_cell_checks_note_range() {
        let mut song = Song::default();
        assert_eq!(
            song.set_cell(0, 0, Cell::tone(Note::On(200))),
            Err(SongError::NoteOutOfRange(200))
        );
        let bad_original = Cell::sampled(Note::On(60), "kick.wav", Note::On(130)).unwrap();
        assert_eq!(song.set_cell(0, 0, bad_original), Err(SongError::NoteOutOfRange(130)));
        assert!(song.cell(0, 0).unwrap().is_rest());

        let silent = Cell::sampled(Note::On(0), "kick.wav", Note::On(60)).unwrap();
        song.set_cell(0, 1, silent).unwrap();
        let stored = song.cell(0, 1).unwrap();
        assert_eq!(stored.note(), Note::Rest);
        assert!(!stored.is_sampled());
    }

    #[test]
    fn clear_cell_resets_to_rest() {
        let mut song = Song::default();
        song.set_tone(0, 0, 60).unwrap();
        song.clear_cell(0, 0).unwrap();
        assert!(song.cell(0, 0).unwrap().is_rest());
    }
}
