//! Decoded sample data.

use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::song::SAMPLE_RATE;

/// A decoded sample asset: mono 16-bit PCM at a known rate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    /// Sample name (usually the asset's file stem)
    pub name: ArrayString<32>,
    /// Mono PCM frames
    pub data: Vec<i16>,
    /// Rate the frames were recorded at, in Hz
    pub sample_rate: u32,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            data: Vec::new(),
            sample_rate: SAMPLE_RATE,
        }
    }
}

impl Sample {
    /// Create an empty sample at the engine rate. Names longer than the
    /// capacity are truncated at a character boundary.
    pub fn new(name: &str) -> Self {
        let mut sample = Self::default();
        for ch in name.chars() {
            if sample.name.try_push(ch).is_err() {
                break;
            }
        }
        sample
    }

    /// Create a sample from mono frames at `sample_rate`.
    pub fn from_frames(name: &str, data: Vec<i16>, sample_rate: u32) -> Self {
        let mut sample = Self::new(name);
        sample.data = data;
        sample.sample_rate = sample_rate;
        sample
    }

    /// Length in frames.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if the frames must be conformed before mixing at the engine rate.
    pub fn needs_rate_conversion(&self) -> bool {
        self.sample_rate != SAMPLE_RATE
    }
}
