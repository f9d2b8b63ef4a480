//! Stock grooves loaded into the first pattern slots.

use pb_engine::Sequencer;
use pb_ir::{Pattern, NUM_TRACKS};

/// One named preset: a step bitmask per track (bit `n` = step `n`).
pub struct Preset {
    pub name: &'static str,
    pub masks: [u16; NUM_TRACKS],
}

impl Preset {
    pub fn pattern(&self) -> Pattern {
        Pattern::from_masks(&self.masks)
    }
}

/// Mask with the listed steps set.
const fn at(steps: &[u8]) -> u16 {
    let mut mask = 0u16;
    let mut i = 0;
    while i < steps.len() {
        mask |= 1 << steps[i];
        i += 1;
    }
    mask
}

/// Mask with every `stride`-th step set, starting at `first`.
const fn every(first: u8, stride: u8) -> u16 {
    let mut mask = 0u16;
    let mut step = first;
    while step < 16 {
        mask |= 1 << step;
        step += stride;
    }
    mask
}

pub const PRESETS: [Preset; 5] = [
    Preset {
        name: "Hip Hop",
        masks: [
            at(&[0, 3, 10]),
            at(&[4, 12]),
            every(0, 2),
            at(&[6, 14]),
            at(&[4, 12]),
            at(&[11]),
            at(&[7]),
            at(&[5, 13]),
            at(&[2, 6, 10, 14]),
            at(&[15]),
            at(&[9, 13]),
            at(&[7, 11]),
            at(&[1, 5, 9, 13]),
            at(&[3, 11]),
            at(&[6, 10]),
            at(&[3, 7, 15]),
        ],
    },
    Preset {
        name: "Techno",
        masks: [
            every(0, 4),
            at(&[4, 12]),
            every(0, 1),
            at(&[8]),
            at(&[4, 8, 12]),
            every(2, 4),
            at(&[7, 11, 15]),
            every(3, 4),
            every(1, 2),
            at(&[0, 8]),
            at(&[5, 9, 13]),
            at(&[3, 7, 15]),
            every(0, 4),
            every(2, 4),
            every(1, 4),
            at(&[7, 11, 15]),
        ],
    },
    Preset {
        name: "Drum & Bass",
        masks: [
            at(&[0, 2, 10]),
            at(&[4, 7, 10, 12]),
            every(0, 1),
            at(&[6, 10, 14]),
            at(&[4, 8, 12]),
            at(&[5, 9, 13]),
            at(&[3, 6, 8, 11]),
            every(0, 3),
            every(0, 2),
            at(&[0, 8, 15]),
            every(1, 3),
            every(1, 4),
            every(2, 4),
            at(&[3, 7, 11, 14]),
            every(1, 3),
            every(0, 4),
        ],
    },
    Preset {
        name: "Breakbeat",
        masks: [
            at(&[0, 5, 10]),
            at(&[4, 12, 13]),
            every(0, 3),
            at(&[6, 10, 14]),
            at(&[4, 9, 12]),
            every(3, 4),
            at(&[1, 3, 9]),
            every(0, 4),
            every(1, 4),
            at(&[0, 12]),
            every(2, 4),
            at(&[4, 8, 14]),
            every(1, 3),
            at(&[2, 6, 11]),
            at(&[3, 5, 9, 15]),
            at(&[7, 10, 13]),
        ],
    },
    Preset {
        name: "House",
        masks: [
            every(0, 4),
            at(&[4, 12]),
            every(2, 4),
            at(&[6, 10, 14]),
            at(&[4, 8, 12]),
            every(3, 4),
            every(1, 4),
            every(0, 4),
            every(2, 4),
            at(&[0, 8]),
            at(&[5, 9, 13]),
            every(3, 4),
            every(0, 2),
            at(&[6, 10, 15]),
            every(1, 4),
            every(1, 4),
        ],
    },
];

/// Advances through the first `len` pattern slots every `every` bars.
///
/// The switch is queued during the last bar so it lands on the downbeat.
#[derive(Clone, Copy, Debug)]
pub struct PatternCycle {
    every: Option<u32>,
    len: usize,
    next_switch: u32,
}

impl PatternCycle {
    pub fn new(every: Option<u32>, len: usize) -> Self {
        Self {
            every: every.filter(|&n| n > 0),
            len: len.max(1),
            next_switch: 0,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, 1)
    }

    /// Call after every `advance`. Returns the pattern queued, if any.
    pub fn poll(&mut self, seq: &mut Sequencer) -> Option<usize> {
        let every = self.every?;
        if !seq.is_playing() || seq.queued_pattern().is_some() {
            return None;
        }
        let bars = seq.bars_played();
        if bars + 1 < self.next_switch.saturating_sub(every) {
            // Transport restarted.
            self.next_switch = 0;
        }
        if self.next_switch == 0 {
            self.next_switch = every;
        }
        if bars + 1 < self.next_switch {
            return None;
        }
        let next = (seq.current_pattern() as usize + 1) % self.len;
        seq.queue_pattern(next).ok()?;
        self.next_switch = self.next_switch.saturating_add(every);
        Some(next)
    }
}
