//! Equal-temperament pitch math.
//!
//! Notes are MIDI numbers (69 = A4 = 440 Hz); 0 is a rest and never
//! produces a frequency or a pitch shift.

/// Ratios closer to 1.0 than this are treated as "no pitch shift".
pub const PITCH_EPSILON: f64 = 0.001;

/// Frequency in Hz of a MIDI note: `440 * 2^((note - 69) / 12)`.
///
/// Returns 0.0 for the rest note.
pub fn note_frequency(note: u8) -> f64 {
    if note == 0 {
        return 0.0;
    }
    440.0 * libm::pow(2.0, (note as f64 - 69.0) / 12.0)
}

/// Playback-rate multiplier that moves a sample recorded at `original`
/// to sound at `target`: `2^((target - original) / 12)`.
///
/// Returns exactly 1.0 when either note is a rest. The result is not
/// clamped here; the resampler owns the engine's pitch limits.
pub fn pitch_ratio(original: u8, target: u8) -> f64 {
    if original == 0 || target == 0 {
        return 1.0;
    }
    let semitones = target as i32 - original as i32;
    libm::pow(2.0, semitones as f64 / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_440() {
        assert!((note_frequency(69) - 440.0).abs() < 1e-9);
    }

    #[test]
    fn octave_doubles_frequency() {
        assert!((note_frequency(81) - 880.0).abs() < 1e-9);
        assert!((note_frequency(57) - 220.0).abs() < 1e-9);
    }

    #[test]
    fn rest_has_no_frequency() {
        assert_eq!(note_frequency(0), 0.0);
    }

    #[test]
    fn same_note_is_unity() {
        for note in 1..=127u8 {
            assert_eq!(pitch_ratio(note, note), 1.0);
        }
    }

    #[test]
    fn semitone_delta_matches_twelfth_root() {
        let original = 60u8;
        for delta in -59i32..=67 {
            let target = (original as i32 + delta) as u8;
            let expected = 2f64.powf(delta as f64 / 12.0);
            let ratio = pitch_ratio(original, target);
            assert!(
                (ratio - expected).abs() < 1e-9,
                "delta {}: {} vs {}",
                delta,
                ratio,
                expected
            );
        }
    }

    #[test]
    fn rest_on_either_side_is_unity() {
        assert_eq!(pitch_ratio(0, 72), 1.0);
        assert_eq!(pitch_ratio(60, 0), 1.0);
    }
}
