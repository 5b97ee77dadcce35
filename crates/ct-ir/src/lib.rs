//! Core song model for the ctracker step sequencer.
//!
//! Defines the notes, cells, tracks and songs that the playback scheduler
//! and the offline renderer consume, plus the pitch math shared by both.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod pattern;
mod pitch;
mod sample;
pub mod song;

pub use pattern::{AssetRef, Cell, Note, Track, ASSET_REF_CAPACITY, DEFAULT_ORIGINAL_NOTE};
pub use pitch::{note_frequency, pitch_ratio, PITCH_EPSILON};
pub use sample::Sample;
pub use song::{
    row_duration_ms, row_frames, LoopWindow, Song, SongError, BPM_RANGE, DEFAULT_BPM,
    DEFAULT_ROWS, MAX_CHANNELS, SAMPLE_RATE,
};
