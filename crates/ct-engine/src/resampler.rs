//! Linear-interpolation resampling for pitch shifting and rate conversion.

use ct_ir::PITCH_EPSILON;

use crate::error::{EngineError, Result};

/// Lowest playback-rate multiplier (one octave down).
pub const MIN_PITCH_RATIO: f64 = 0.5;
/// Highest playback-rate multiplier (one octave up).
pub const MAX_PITCH_RATIO: f64 = 2.0;

/// Output of [`resample`].
#[derive(Clone, Debug, PartialEq)]
pub struct Resampled {
    pub samples: Vec<i16>,
    /// Ratio actually used to produce `samples`.
    pub applied_ratio: f64,
    /// True if the requested ratio fell outside the pitch limits.
    pub clamped: bool,
}

/// Pitch-shift `source` by `ratio`.
///
/// Ratios within [`PITCH_EPSILON`] of 1.0 return an exact copy. Anything
/// else is clamped to `[0.5, 2.0]` and the output holds
/// `floor(len / ratio)` frames, each a linear blend of the two nearest
/// source frames truncated toward zero.
pub fn resample(source: &[i16], ratio: f64) -> Result<Resampled> {
    if (ratio - 1.0).abs() < PITCH_EPSILON {
        return Ok(Resampled {
            samples: copy(source)?,
            applied_ratio: 1.0,
            clamped: false,
        });
    }

    let applied_ratio = ratio.clamp(MIN_PITCH_RATIO, MAX_PITCH_RATIO);
    Ok(Resampled {
        samples: interpolate(source, applied_ratio)?,
        applied_ratio,
        clamped: applied_ratio != ratio,
    })
}

/// Convert `source` recorded at `from_rate` to `to_rate`. No pitch
/// limits apply here.
pub fn conform_rate(source: &[i16], from_rate: u32, to_rate: u32) -> Result<Vec<i16>> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 {
        return copy(source);
    }
    interpolate(source, from_rate as f64 / to_rate as f64)
}

fn copy(source: &[i16]) -> Result<Vec<i16>> {
    let mut out = reserve(source.len())?;
    out.extend_from_slice(source);
    Ok(out)
}

fn reserve(frames: usize) -> Result<Vec<i16>> {
    let mut out = Vec::new();
    out.try_reserve_exact(frames)
        .map_err(|_| EngineError::Allocation { frames })?;
    Ok(out)
}

fn interpolate(source: &[i16], ratio: f64) -> Result<Vec<i16>> {
    if source.is_empty() {
        return Ok(Vec::new());
    }
    let new_len = (source.len() as f64 / ratio) as usize;
    let mut out = reserve(new_len)?;
    let last = source.len() - 1;

    for i in 0..new_len {
        let pos = i as f64 * ratio;
        let idx1 = (pos as usize).min(last);
        let idx2 = (idx1 + 1).min(last);
        let frac = pos - idx1 as f64;
        let value = source[idx1] as f64 * (1.0 - frac) + source[idx2] as f64 * frac;
        out.push(value as i16);
    }
    Ok(out)
}
