//! Bit-depth reduction.

use pb_ir::clamp_bit_depth;

use super::Effect;
use crate::frame::Frame;

/// Zeroes the low `16 - depth` bits of each sample. No dither.
pub struct Bitcrusher {
    depth: u8,
}

impl Bitcrusher {
    pub fn new(depth: u8) -> Self {
        Self {
            depth: clamp_bit_depth(depth),
        }
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Depth in bits, clamped to 4-16.
    pub fn set_depth(&mut self, depth: u8) {
        self.depth = clamp_bit_depth(depth);
    }
}

impl Effect for Bitcrusher {
    fn process(&mut self, frame: Frame) -> Frame {
        if self.is_bypassed() {
            return frame;
        }
        let shift = 16 - self.depth as u32;
        Frame {
            left: (frame.left >> shift) << shift,
            right: (frame.right >> shift) << shift,
        }
    }

    fn reset(&mut self) {}

    fn is_bypassed(&self) -> bool {
        self.depth >= 16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixteen_bits_is_bypassed() {
        let mut b = Bitcrusher::new(16);
        assert_eq!(b.process(Frame::mono(-12345)), Frame::mono(-12345));
    }

    #[test]
    fn masks_low_bits() {
        let mut b = Bitcrusher::new(8);
        assert_eq!(b.process(Frame::mono(0x1234)).left, 0x1200);
        // Arithmetic shift rounds negatives towards minus infinity.
        assert_eq!(b.process(Frame::mono(-1)).left, -256);
    }

    #[test]
    fn four_bits_leaves_sixteen_levels() {
        let mut b = Bitcrusher::new(4);
        let mut levels: Vec<i16> = (i16::MIN..=i16::MAX)
            .step_by(97)
            .map(|v| b.process(Frame::mono(v)).left)
            .collect();
        levels.sort_unstable();
        levels.dedup();
        assert_eq!(levels.len(), 16);
    }
}
