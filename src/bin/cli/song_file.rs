//! JSON song files.
//!
//! A song file lists only the cells that sound; everything else is a
//! rest. Every value goes through the same validation as an edit.
//!
//! ```json
//! {
//!   "title": "demo",
//!   "bpm": 120,
//!   "rows": 16,
//!   "channels": 8,
//!   "loop": { "start": 0, "end": 7 },
//!   "cells": [
//!     { "channel": 0, "row": 0, "note": 69 },
//!     { "channel": 4, "row": 2, "note": 72, "sample": "kick.wav", "original_note": 60 }
//!   ]
//! }
//! ```

use ct_master::{Song, SongError, DEFAULT_ORIGINAL_NOTE};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SongFile {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_bpm")]
    pub bpm: u32,
    #[serde(default = "default_rows")]
    pub rows: usize,
    #[serde(default = "default_channels")]
    pub channels: usize,
    #[serde(default, rename = "loop")]
    pub loop_range: Option<LoopRange>,
    #[serde(default)]
    pub cells: Vec<CellEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoopRange {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CellEntry {
    pub channel: usize,
    pub row: usize,
    /// MIDI note, 0 for a rest
    pub note: u8,
    #[serde(default)]
    pub sample: Option<String>,
    #[serde(default)]
    pub original_note: Option<u8>,
}

fn default_bpm() -> u32 {
    ct_master::DEFAULT_BPM
}

fn default_rows() -> usize {
    ct_master::DEFAULT_ROWS
}

fn default_channels() -> usize {
    ct_master::MAX_CHANNELS
}

impl SongFile {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Build a validated song.
    pub fn into_song(self) -> Result<Song, SongError> {
        let mut song = Song::new(self.channels, self.rows)?;
        song.set_title(&self.title);
        song.set_bpm(self.bpm)?;
        for cell in &self.cells {
            match &cell.sample {
                Some(asset) => song.set_sample(
                    cell.channel,
                    cell.row,
                    cell.note,
                    asset,
                    cell.original_note.unwrap_or(DEFAULT_ORIGINAL_NOTE),
                )?,
                None => song.set_tone(cell.channel, cell.row, cell.note)?,
            }
        }
        if let Some(range) = &self.loop_range {
            song.set_loop(range.start, range.end)?;
        }
        Ok(song)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_master::Note;

    #[test]
    fn empty_object_is_the_default_song() {
        let song = SongFile::parse("{}").unwrap().into_song().unwrap();
        assert_eq!(song.channels(), 8);
        assert_eq!(song.row_count(), 16);
        assert_eq!(song.bpm(), 120);
        assert!(!song.loop_window().enabled());
    }

    #[test]
    fn cells_and_loop_are_applied() {
        let text = r#"{
            "title": "demo",
            "bpm": 140,
            "rows": 8,
            "channels": 4,
            "loop": { "start": 2, "end": 5 },
            "cells": [
                { "channel": 0, "row": 0, "note": 69 },
                { "channel": 3, "row": 4, "note": 72, "sample": "kick.wav" }
            ]
        }"#;
        let song = SongFile::parse(text).unwrap().into_song().unwrap();
        assert_eq!(song.title.as_str(), "demo");
        assert_eq!(song.bpm(), 140);
        assert_eq!(song.cell(0, 0).unwrap().note(), Note::On(69));
        let sampled = song.cell(3, 4).unwrap();
        assert_eq!(sampled.sample(), Some("kick.wav"));
        assert_eq!(sampled.original_note(), Note::On(60));
        assert!((sampled.pitch_ratio() - 2.0).abs() < 1e-9);
        let window = song.loop_window();
        assert!(window.enabled());
        assert_eq!((window.start(), window.end()), (2, 5));
    }

    #[test]
    fn invalid_loop_is_rejected() {
        let text = r#"{ "rows": 8, "loop": { "start": 5, "end": 5 } }"#;
        assert!(matches!(
            SongFile::parse(text).unwrap().into_song(),
            Err(SongError::InvalidLoopRange { .. })
        ));
    }

    #[test]
    fn out_of_range_cell_is_rejected() {
        let text = r#"{ "channels": 2, "cells": [ { "channel": 2, "row": 0, "note": 60 } ] }"#;
        assert!(matches!(
            SongFile::parse(text).unwrap().into_song(),
            Err(SongError::ChannelOutOfRange { .. })
        ));
    }

    #[test]
    fn bpm_outside_range_is_rejected() {
        let text = r#"{ "bpm": 10 }"#;
        assert_eq!(
            SongFile::parse(text).unwrap().into_song().unwrap_err(),
            SongError::BpmOutOfRange(10)
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(SongFile::parse(r#"{ "tempo": 120 }"#).is_err());
    }
}
