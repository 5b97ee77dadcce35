//! Note, cell and track types for the step grid.

use alloc::vec;
use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::pitch::{note_frequency, pitch_ratio};
use crate::song::SongError;

/// Reference pitch assumed for a sample when none is given (C4).
pub const DEFAULT_ORIGINAL_NOTE: u8 = 60;

/// Maximum length in bytes of a sample asset reference.
pub const ASSET_REF_CAPACITY: usize = 64;

/// Path or handle of a sample asset attached to a cell.
pub type AssetRef = ArrayString<ASSET_REF_CAPACITY>;

/// A note value in a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Note {
    /// Silence (MIDI 0)
    #[default]
    Rest,
    /// Note on with MIDI note number (1-127, where 69 = A4). `On(0)`
    /// behaves as a rest; values above 127 are rejected by [`Song`].
    ///
    /// [`Song`]: crate::Song
    On(u8),
}

impl Note {
    /// Build a note from a MIDI number. 0 is a rest; values above 127
    /// are rejected.
    pub const fn from_midi(midi: u8) -> Option<Self> {
        match midi {
            0 => Some(Note::Rest),
            1..=127 => Some(Note::On(midi)),
            _ => None,
        }
    }

    /// MIDI number of this note (0 for a rest).
    pub const fn midi(self) -> u8 {
        match self {
            Note::Rest => 0,
            Note::On(n) => n,
        }
    }

    pub const fn is_rest(self) -> bool {
        matches!(self, Note::Rest | Note::On(0))
    }

    /// The canonical form of this note: `On(0)` becomes `Rest`, and
    /// `None` if the number is outside MIDI range.
    pub const fn validated(self) -> Option<Self> {
        Note::from_midi(self.midi())
    }

    /// Frequency in Hz, 0.0 for a rest.
    pub fn frequency(self) -> f64 {
        note_frequency(self.midi())
    }
}

/// The note/sample assignment for one channel at one row.
///
/// `pitch_ratio` and `duration_ms` are derived values: the ratio follows
/// the note and the sample's reference pitch, the duration follows the
/// song's BPM. Both are kept current by the editing methods on [`Song`].
///
/// [`Song`]: crate::Song
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    note: Note,
    original_note: Note,
    duration_ms: u32,
    sample: Option<AssetRef>,
    pitch_ratio: f64,
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

impl Cell {
    /// A rest with the default reference pitch.
    pub const fn empty() -> Self {
        Self {
            note: Note::Rest,
            original_note: Note::On(DEFAULT_ORIGINAL_NOTE),
            duration_ms: 0,
            sample: None,
            pitch_ratio: 1.0,
        }
    }

    /// A synthesized tone cell.
    pub fn tone(note: Note) -> Self {
        let mut cell = Self::empty();
        cell.note = note;
        cell
    }

    /// A sample-based cell playing `asset` (recorded at `original_note`)
    /// at `note`. An `original_note` of rest falls back to C4.
    pub fn sampled(note: Note, asset: &str, original_note: Note) -> Result<Self, SongError> {
        let sample = AssetRef::from(asset).map_err(|_| SongError::AssetRefTooLong {
            len: asset.len(),
        })?;
        let original_note = if original_note.is_rest() {
            Note::On(DEFAULT_ORIGINAL_NOTE)
        } else {
            original_note
        };
        let mut cell = Self {
            note,
            original_note,
            duration_ms: 0,
            sample: Some(sample),
            pitch_ratio: 1.0,
        };
        cell.refresh_pitch();
        Ok(cell)
    }

    pub fn note(&self) -> Note {
        self.note
    }

    /// Reference pitch of the attached sample.
    pub fn original_note(&self) -> Note {
        self.original_note
    }

    /// Row duration cached from the song's BPM.
    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    /// Attached sample asset, if any.
    pub fn sample(&self) -> Option<&str> {
        self.sample.as_ref().map(|s| s.as_str())
    }

    pub fn asset(&self) -> Option<&AssetRef> {
        self.sample.as_ref()
    }

    /// Playback-rate multiplier, `2^((note - original_note) / 12)`.
    pub fn pitch_ratio(&self) -> f64 {
        self.pitch_ratio
    }

    /// True if this cell never produces a voice.
    pub fn is_rest(&self) -> bool {
        self.note.is_rest()
    }

    /// True for a sounding cell with a sample attached.
    pub fn is_sampled(&self) -> bool {
        !self.is_rest() && self.sample.is_some()
    }

    /// True for a sounding cell without a sample (synthesized sine).
    pub fn is_synth(&self) -> bool {
        !self.is_rest() && self.sample.is_none()
    }

    /// Canonicalize both notes. Fails on a note above MIDI 127.
    pub(crate) fn validate(&mut self) -> Result<(), SongError> {
        self.note = self
            .note
            .validated()
            .ok_or(SongError::NoteOutOfRange(self.note.midi()))?;
        self.original_note = match self.original_note.validated() {
            None => return Err(SongError::NoteOutOfRange(self.original_note.midi())),
            Some(Note::Rest) => Note::On(DEFAULT_ORIGINAL_NOTE),
            Some(note) => note,
        };
        self.refresh_pitch();
        Ok(())
    }

    pub(crate) fn set_duration_ms(&mut self, duration_ms: u32) {
        self.duration_ms = duration_ms;
    }

    fn refresh_pitch(&mut self) {
        self.pitch_ratio = pitch_ratio(self.original_note.midi(), self.note.midi());
    }
}

/// One channel's fixed-length column of cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    cells: Vec<Cell>,
}

impl Track {
    /// Create a track of `rows` empty cells.
    pub fn new(rows: usize) -> Self {
        Self {
            cells: vec![Cell::empty(); rows],
        }
    }

    pub fn cell(&self, row: usize) -> Option<&Cell> {
        self.cells.get(row)
    }

    pub(crate) fn cell_mut(&mut self, row: usize) -> Option<&mut Cell> {
        self.cells.get_mut(row)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
