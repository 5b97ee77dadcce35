//! Row mixing: voices into a stereo buffer with a fixed channel pan.

use ct_ir::{Cell, Song, MAX_CHANNELS};

use crate::bank::SampleBank;
use crate::error::{EngineError, Result};
use crate::frame::Frame;
use crate::voice::{RenderMode, Voice, VoiceSpec};

/// Channels below this index lean left, the rest lean right.
const LEFT_CHANNELS: usize = 4;
const NEAR_GAIN: f32 = 0.7;
const FAR_GAIN: f32 = 0.3;

/// `(left, right)` gains for `channel`.
pub const fn pan_gains(channel: usize) -> (f32, f32) {
    if channel < LEFT_CHANNELS {
        (NEAR_GAIN, FAR_GAIN)
    } else {
        (FAR_GAIN, NEAR_GAIN)
    }
}

/// A sounding cell at a known channel.
#[derive(Clone, Copy, Debug)]
pub struct ActiveCell<'a> {
    pub channel: usize,
    pub cell: &'a Cell,
}

/// The sounding cells of one row, at most one per channel.
pub type RowCells<'a> = heapless::Vec<ActiveCell<'a>, MAX_CHANNELS>;

/// Collect the non-rest cells at `row`.
pub fn active_cells(song: &Song, row: usize) -> RowCells<'_> {
    let mut cells = RowCells::new();
    for (channel, cell) in song.row(row).filter(|(_, cell)| !cell.is_rest()) {
        if cells.push(ActiveCell { channel, cell }).is_err() {
            break;
        }
    }
    cells
}

/// One mixed row plus what happened while rendering it.
#[derive(Clone, Debug, Default)]
pub struct RowMix {
    pub frames: Vec<Frame>,
    /// Voices triggered.
    pub voices: usize,
    /// Voices whose pitch was clamped.
    pub clamped: usize,
    /// Sample voices that fell silent on a bad asset.
    pub failed: usize,
}

/// A zeroed stereo buffer of `frames` frames.
pub fn silent_buffer(frames: usize) -> Result<Vec<Frame>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(frames)
        .map_err(|_| EngineError::Allocation { frames })?;
    buffer.resize(frames, Frame::silence());
    Ok(buffer)
}

/// Add a mono voice into `dst` at `channel`'s pan position. Voices
/// shorter than `dst` leave the remainder untouched; longer ones are cut.
pub fn mix_voice(dst: &mut [Frame], voice: &[i16], channel: usize) {
    for (frame, &sample) in dst.iter_mut().zip(voice) {
        frame.mix(Frame::panned(sample, channel));
    }
}

/// Add `src` into `dst` frame by frame.
pub fn mix_into(dst: &mut [Frame], src: &[Frame]) {
    for (frame, &other) in dst.iter_mut().zip(src) {
        frame.mix(other);
    }
}

/// Render and mix every voice of a row into `row_frames` frames.
pub fn mix_row(cells: &[ActiveCell<'_>], row_frames: usize, duration_ms: u32, bank: &mut SampleBank) -> Result<RowMix> {
    let mut mix = RowMix {
        frames: silent_buffer(row_frames)?,
        ..RowMix::default()
    };
    for active in cells {
        let Some(spec) = VoiceSpec::for_cell(active.cell, duration_ms) else {
            continue;
        };
        let output = Voice::new(spec, RenderMode::Offline).start(bank)?;
        mix.voices += 1;
        if output.pitch_clamped {
            mix.clamped += 1;
        }
        if output.asset_error.is_some() {
            mix.failed += 1;
        }
        mix_voice(&mut mix.frames, &output.samples, active.channel);
    }
    Ok(mix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::MemoryLoader;
    use ct_ir::{Note, Sample, SAMPLE_RATE};
    use std::sync::Arc;

    fn bank() -> SampleBank {
        let mut loader = MemoryLoader::new();
        loader.insert("loud.wav", Sample::from_frames("loud", vec![i16::MAX; 20_000], SAMPLE_RATE));
        loader.insert("dc.wav", Sample::from_frames("dc", vec![10_000; 100], SAMPLE_RATE));
        SampleBank::new(Arc::new(loader))
    }

    #[test]
    fn pan_law() {
        for ch in 0..4 {
            assert_eq!(pan_gains(ch), (0.7, 0.3));
        }
        for ch in 4..8 {
            assert_eq!(pan_gains(ch), (0.3, 0.7));
        }
    }

    #[test]
    fn all_rest_row_is_silent() {
        let song = Song::default();
        let cells = active_cells(&song, 0);
        assert!(cells.is_empty());
        let mix = mix_row(&cells, 5512, 125, &mut bank()).unwrap();
        assert_eq!(mix.frames.len(), 5512);
        assert!(mix.frames.iter().all(|f| *f == Frame::silence()));
        assert_eq!(mix.voices, 0);
    }

    #[test]
    fn active_cells_skip_rests() {
        let mut song = Song::default();
        song.set_tone(1, 0, 60).unwrap();
        song.set_tone(6, 0, 64).unwrap();
        let cells = active_cells(&song, 0);
        let channels: Vec<usize> = cells.iter().map(|c| c.channel).collect();
        assert_eq!(channels, vec![1, 6]);
    }

    #[test]
    fn midi_zero_cells_stay_silent() {
        let mut song = Song::default();
        song.set_cell(0, 0, Cell::sampled(Note::On(0), "dc.wav", Note::On(60)).unwrap())
            .unwrap();
        song.set_cell(5, 0, Cell::tone(Note::On(0))).unwrap();
        let cells = active_cells(&song, 0);
        assert!(cells.is_empty());
        let mix = mix_row(&cells, 100, 125, &mut bank()).unwrap();
        assert_eq!(mix.voices, 0);
        assert!(mix.frames.iter().all(|f| *f == Frame::silence()));
    }

    #[test]
    fn short_voice_leaves_tail_silent() {
        let mut song = Song::default();
        song.set_sample(0, 0, 60, "dc.wav", 60).unwrap();
        let cells = active_cells(&song, 0);
        let mix = mix_row(&cells, 200, 125, &mut bank()).unwrap();
        assert_eq!(mix.frames[0], Frame { left: 7000, right: 3000 });
        assert_eq!(mix.frames[99], Frame { left: 7000, right: 3000 });
        assert_eq!(mix.frames[100], Frame::silence());
    }

    #[test]
    fn eight_loud_channels_saturate_without_wrapping() {
        let mut song = Song::default();
        for ch in 0..8 {
            song.set_sample(ch, 0, 60, "loud.wav", 60).unwrap();
        }
        let cells = active_cells(&song, 0);
        let mix = mix_row(&cells, 1000, 125, &mut bank()).unwrap();
        assert_eq!(mix.voices, 8);
        assert!(mix.frames.iter().all(|f| *f == Frame::mono(i16::MAX)));
    }

    #[test]
    fn missing_asset_counts_as_failed_and_others_still_play() {
        let mut song = Song::default();
        song.set_sample(0, 0, 60, "nope.wav", 60).unwrap();
        song.set_sample(5, 0, 60, "dc.wav", 60).unwrap();
        let cells = active_cells(&song, 0);
        let mix = mix_row(&cells, 100, 125, &mut bank()).unwrap();
        assert_eq!(mix.failed, 1);
        assert_eq!(mix.frames[0], Frame { left: 3000, right: 7000 });
    }

    #[test]
    fn mix_into_saturates() {
        let mut dst = vec![Frame::mono(30_000); 4];
        mix_into(&mut dst, &[Frame::mono(5_000); 2]);
        assert_eq!(dst[0], Frame::mono(i16::MAX));
        assert_eq!(dst[3], Frame::mono(30_000));
    }
}
