//! Voice: one note's worth of audio for one channel.

use core::f64::consts::TAU;

use ct_ir::{row_frames, AssetRef, Cell, SAMPLE_RATE};
use tracing::warn;

use crate::bank::SampleBank;
use crate::error::{AssetError, EngineError, Result};
use crate::resampler::resample;

/// Which generator a voice uses. A channel can hold one of each at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoiceKind {
    Tone,
    Sample,
}

impl VoiceKind {
    pub const fn index(self) -> usize {
        match self {
            VoiceKind::Tone => 0,
            VoiceKind::Sample => 1,
        }
    }
}

/// Rendering context. Live tones play at full scale for the whole row;
/// offline tones are attenuated so eight channels sum without clipping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    #[default]
    Live,
    Offline,
}

impl RenderMode {
    /// Amplitude multiplier applied to synthesized tones.
    pub const fn tone_gain(self) -> f64 {
        match self {
            RenderMode::Live => 1.0,
            RenderMode::Offline => 0.3,
        }
    }
}

/// What a voice should play, resolved from a cell.
#[derive(Clone, Debug, PartialEq)]
pub enum VoiceSpec {
    Tone {
        frequency: f64,
        duration_ms: u32,
    },
    Sample {
        asset: AssetRef,
        pitch_ratio: f64,
        duration_ms: u32,
    },
}

impl VoiceSpec {
    /// Resolve the voice a cell triggers for a row of `duration_ms`.
    /// Rests trigger nothing.
    pub fn for_cell(cell: &Cell, duration_ms: u32) -> Option<Self> {
        if cell.is_rest() {
            return None;
        }
        match cell.asset() {
            Some(asset) => Some(VoiceSpec::Sample {
                asset: *asset,
                pitch_ratio: cell.pitch_ratio(),
                duration_ms,
            }),
            None => Some(VoiceSpec::Tone {
                frequency: cell.note().frequency(),
                duration_ms,
            }),
        }
    }

    pub fn kind(&self) -> VoiceKind {
        match self {
            VoiceSpec::Tone { .. } => VoiceKind::Tone,
            VoiceSpec::Sample { .. } => VoiceKind::Sample,
        }
    }

    pub fn duration_ms(&self) -> u32 {
        match self {
            VoiceSpec::Tone { duration_ms, .. } | VoiceSpec::Sample { duration_ms, .. } => *duration_ms,
        }
    }
}

/// Audio produced by a started voice.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VoiceOutput {
    /// Mono frames at the engine rate.
    pub samples: Vec<i16>,
    /// How long the voice holds its slot.
    pub duration_ms: u32,
    /// The requested pitch was outside one octave and got clamped.
    pub pitch_clamped: bool,
    /// The sample asset failed to load; `samples` is empty.
    pub asset_error: Option<AssetError>,
}

impl VoiceOutput {
    fn failed(err: AssetError, duration_ms: u32) -> Self {
        Self {
            duration_ms,
            asset_error: Some(err),
            ..Self::default()
        }
    }
}

/// A single voice. It is active from creation until it has produced its
/// audio once (or been cancelled); a finished voice yields nothing.
#[derive(Clone, Debug)]
pub struct Voice {
    spec: VoiceSpec,
    mode: RenderMode,
    active: bool,
}

impl Voice {
    pub fn new(spec: VoiceSpec, mode: RenderMode) -> Self {
        Self {
            spec,
            mode,
            active: true,
        }
    }

    pub fn spec(&self) -> &VoiceSpec {
        &self.spec
    }

    pub fn kind(&self) -> VoiceKind {
        self.spec.kind()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Stop the voice before it starts.
    pub fn cancel(&mut self) {
        self.active = false;
    }

    /// Produce this voice's audio and mark it inactive.
    ///
    /// A missing or unreadable asset is not an error: the voice comes back
    /// silent with `asset_error` set. Only allocation failures propagate.
    pub fn start(&mut self, bank: &mut SampleBank) -> Result<VoiceOutput> {
        if !self.active {
            return Ok(VoiceOutput::default());
        }
        let output = self.render(bank);
        self.active = false;
        output
    }

    fn render(&self, bank: &mut SampleBank) -> Result<VoiceOutput> {
        match &self.spec {
            VoiceSpec::Tone {
                frequency,
                duration_ms,
            } => Ok(VoiceOutput {
                samples: render_tone(*frequency, row_frames(*duration_ms), self.mode.tone_gain())?,
                duration_ms: *duration_ms,
                ..VoiceOutput::default()
            }),
            VoiceSpec::Sample {
                asset,
                pitch_ratio,
                duration_ms,
            } => {
                let sample = match bank.get(asset) {
                    Ok(sample) => sample,
                    Err(EngineError::Asset(err)) => {
                        warn!(asset = asset.as_str(), error = %err, "sample voice silenced");
                        return Ok(VoiceOutput::failed(err, *duration_ms));
                    }
                    Err(err) => return Err(err),
                };
                let shifted = resample(&sample.data, *pitch_ratio)?;
                if shifted.clamped {
                    warn!(
                        asset = asset.as_str(),
                        requested = *pitch_ratio,
                        applied = shifted.applied_ratio,
                        "pitch ratio clamped to one octave"
                    );
                }

                // A live sample holds its slot for the row scaled by the
                // playback rate; offline it is cut at the row boundary.
                let duration_ms = match self.mode {
                    RenderMode::Live => (*duration_ms as f64 / shifted.applied_ratio) as u32,
                    RenderMode::Offline => *duration_ms,
                };
                let mut samples = shifted.samples;
                samples.truncate(row_frames(duration_ms));
                Ok(VoiceOutput {
                    samples,
                    duration_ms,
                    pitch_clamped: shifted.clamped,
                    asset_error: None,
                })
            }
        }
    }
}

/// Synthesize `frames` of a sine at `frequency` scaled by `gain`.
pub fn render_tone(frequency: f64, frames: usize, gain: f64) -> Result<Vec<i16>> {
    let mut out = Vec::new();
    out.try_reserve_exact(frames)
        .map_err(|_| EngineError::Allocation { frames })?;
    let step = TAU * frequency / SAMPLE_RATE as f64;
    out.extend((0..frames).map(|i| (32767.0 * gain * (step * i as f64).sin()) as i16));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::MemoryLoader;
    use ct_ir::{Note, Sample};
    use std::sync::Arc;

    fn bank_with(name: &str, data: Vec<i16>) -> SampleBank {
        let mut loader = MemoryLoader::new();
        loader.insert(name, Sample::from_frames(name, data, SAMPLE_RATE));
        SampleBank::new(Arc::new(loader))
    }

    #[test]
    fn rest_cell_has_no_voice() {
        assert_eq!(VoiceSpec::for_cell(&Cell::empty(), 125), None);
        let sampled_rest = Cell::sampled(Note::Rest, "kick.wav", Note::On(60)).unwrap();
        assert_eq!(VoiceSpec::for_cell(&sampled_rest, 125), None);
    }

    #[test]
    fn midi_zero_has_no_voice_of_either_kind() {
        assert_eq!(VoiceSpec::for_cell(&Cell::tone(Note::On(0)), 125), None);
        let sampled = Cell::sampled(Note::On(0), "kick.wav", Note::On(48)).unwrap();
        assert_eq!(VoiceSpec::for_cell(&sampled, 125), None);
    }

    #[test]
    fn sampled_cell_keeps_its_asset() {
        let cell = Cell::sampled(Note::On(72), "drums/kick.wav", Note::On(60)).unwrap();
        match VoiceSpec::for_cell(&cell, 125).unwrap() {
            VoiceSpec::Sample { asset, pitch_ratio, .. } => {
                assert_eq!(asset.as_str(), "drums/kick.wav");
                assert!((pitch_ratio - 2.0).abs() < 1e-9);
            }
            other => panic!("expected sample, got {other:?}"),
        }
    }

    #[test]
    fn cell_without_sample_is_a_tone() {
        let spec = VoiceSpec::for_cell(&Cell::tone(Note::On(69)), 125).unwrap();
        assert_eq!(spec.kind(), VoiceKind::Tone);
        match spec {
            VoiceSpec::Tone { frequency, duration_ms } => {
                assert!((frequency - 440.0).abs() < 1e-9);
                assert_eq!(duration_ms, 125);
            }
            other => panic!("expected tone, got {other:?}"),
        }
    }

    #[test]
    fn tone_fills_the_row_at_offline_gain() {
        let mut bank = bank_with("unused", vec![]);
        let spec = VoiceSpec::for_cell(&Cell::tone(Note::On(69)), 125).unwrap();
        let mut voice = Voice::new(spec, RenderMode::Offline);
        let out = voice.start(&mut bank).unwrap();
        assert_eq!(out.samples.len(), row_frames(125));
        let peak = out.samples.iter().map(|s| s.unsigned_abs()).max().unwrap();
        assert!(peak <= (32767.0 * 0.3) as u16 + 1);
        assert!(peak > 9000);
    }

    #[test]
    fn live_tone_is_full_scale() {
        let out = render_tone(440.0, 4410, RenderMode::Live.tone_gain()).unwrap();
        let peak = out.iter().map(|s| s.unsigned_abs()).max().unwrap();
        assert!(peak > 32000);
    }

    #[test]
    fn voice_is_inactive_after_start() {
        let mut bank = bank_with("unused", vec![]);
        let spec = VoiceSpec::for_cell(&Cell::tone(Note::On(60)), 50).unwrap();
        let mut voice = Voice::new(spec, RenderMode::Live);
        assert!(voice.is_active());
        assert!(!voice.start(&mut bank).unwrap().samples.is_empty());
        assert!(!voice.is_active());
        assert!(voice.start(&mut bank).unwrap().samples.is_empty());
    }

    #[test]
    fn cancelled_voice_is_silent() {
        let mut bank = bank_with("unused", vec![]);
        let spec = VoiceSpec::for_cell(&Cell::tone(Note::On(60)), 50).unwrap();
        let mut voice = Voice::new(spec, RenderMode::Live);
        voice.cancel();
        assert!(voice.start(&mut bank).unwrap().samples.is_empty());
    }

    #[test]
    fn offline_sample_is_cut_at_row_boundary() {
        let mut bank = bank_with("long.wav", vec![1000; 44100]);
        let cell = Cell::sampled(Note::On(60), "long.wav", Note::On(60)).unwrap();
        let spec = VoiceSpec::for_cell(&cell, 125).unwrap();
        let out = Voice::new(spec, RenderMode::Offline).start(&mut bank).unwrap();
        assert_eq!(out.samples.len(), row_frames(125));
    }

    #[test]
    fn live_sample_duration_scales_with_pitch() {
        let mut bank = bank_with("long.wav", vec![1000; 44100]);
        let cell = Cell::sampled(Note::On(72), "long.wav", Note::On(60)).unwrap();
        let spec = VoiceSpec::for_cell(&cell, 500).unwrap();
        let out = Voice::new(spec, RenderMode::Live).start(&mut bank).unwrap();
        assert_eq!(out.duration_ms, 250);
        assert_eq!(out.samples.len(), row_frames(250));
    }

    #[test]
    fn short_sample_is_not_padded() {
        let mut bank = bank_with("click.wav", vec![500; 100]);
        let cell = Cell::sampled(Note::On(60), "click.wav", Note::On(60)).unwrap();
        let spec = VoiceSpec::for_cell(&cell, 125).unwrap();
        let out = Voice::new(spec, RenderMode::Offline).start(&mut bank).unwrap();
        assert_eq!(out.samples, vec![500; 100]);
    }

    #[test]
    fn missing_asset_yields_silence_not_error() {
        let mut bank = bank_with("kick.wav", vec![1; 10]);
        let cell = Cell::sampled(Note::On(60), "missing.wav", Note::On(60)).unwrap();
        let spec = VoiceSpec::for_cell(&cell, 125).unwrap();
        let mut voice = Voice::new(spec, RenderMode::Offline);
        let out = voice.start(&mut bank).unwrap();
        assert!(out.samples.is_empty());
        assert!(matches!(out.asset_error, Some(AssetError::NotFound { .. })));
        assert!(!voice.is_active());
    }

    #[test]
    fn extreme_pitch_is_clamped_and_flagged() {
        let mut bank = bank_with("kick.wav", vec![100; 1000]);
        let cell = Cell::sampled(Note::On(96), "kick.wav", Note::On(60)).unwrap();
        let spec = VoiceSpec::for_cell(&cell, 500).unwrap();
        let out = Voice::new(spec, RenderMode::Offline).start(&mut bank).unwrap();
        assert!(out.pitch_clamped);
        assert_eq!(out.samples.len(), 500);
    }
}
