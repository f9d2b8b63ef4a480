//! Audio frame type.

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

    /// Build a frame from wide accumulator values, clamping each channel.
    pub fn from_wide(left: i32, right: i32) -> Self {
        Self {
            left: clamp_i16(left),
            right: clamp_i16(right),
        }
    }

    /// Peak absolute value over both channels.
    pub fn peak(&self) -> u16 {
        self.left.unsigned_abs().max(self.right.unsigned_abs())
    }
}

/// Saturate a 32-bit accumulator to the 16-bit sample range.
#[inline]
pub fn clamp_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
