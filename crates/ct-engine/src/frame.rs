//! Audio frame type.

use crate::mixer::pan_gains;

/// A stereo audio frame (16-bit integer).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub left: i16,
    pub right: i16,
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self { left: 0, right: 0 }
    }

    /// Create a mono frame (same value for both channels).
    pub const fn mono(value: i16) -> Self {
        Self {
            left: value,
            right: value,
        }
    }

    /// Place a mono voice sample in the stereo field of `channel`.
    /// Gains are applied with truncation toward zero.
    pub fn panned(sample: i16, channel: usize) -> Self {
        let (left, right) = pan_gains(channel);
        Self {
            left: (sample as f32 * left) as i16,
            right: (sample as f32 * right) as i16,
        }
    }

    /// Mix another frame into this one.
    ///
    /// This is the only place samples are summed: every add saturates to
    /// the 16-bit range immediately, so no intermediate ever wraps.
    pub fn mix(&mut self, other: Frame) {
        // Use i32 to avoid overflow, then clamp
        let left = (self.left as i32 + other.left as i32).clamp(-32768, 32767);
        let right = (self.right as i32 + other.right as i32).clamp(-32768, 32767);
        self.left = left as i16;
        self.right = right as i16;
    }

    /// Interleaved little-endian bytes (left then right).
    pub fn to_le_bytes(self) -> [u8; 4] {
        let [l0, l1] = self.left.to_le_bytes();
        let [r0, r1] = self.right.to_le_bytes();
        [l0, l1, r0, r1]
    }
}
