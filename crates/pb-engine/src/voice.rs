//! Voice: one playback cursor into a pad's sample buffer.

use pb_ir::{clamp_pitch, clamp_volume, TriggerSource, MAX_VELOCITY};

/// Per-source output level (0-100), applied together with velocity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceGains {
    pub sequencer: u8,
    pub live: u8,
}

impl SourceGains {
    /// Gain for one trigger source.
    pub fn get(&self, source: TriggerSource) -> u8 {
        match source {
            TriggerSource::Sequencer => self.sequencer,
            TriggerSource::Live => self.live,
        }
    }

    /// Set the gain for one trigger source.
    pub fn set(&mut self, source: TriggerSource, volume: u8) {
        let volume = clamp_volume(volume);
        match source {
            TriggerSource::Sequencer => self.sequencer = volume,
            TriggerSource::Live => self.live = volume,
        }
    }
}

impl Default for SourceGains {
    fn default() -> Self {
        Self {
            sequencer: 100,
            live: 100,
        }
    }
}

/// A single voice playing a sample buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Voice {
    /// Pad whose buffer this voice reads.
    pub pad: u8,
    /// Next sample index to read.
    pub position: u32,
    /// Buffer length cached at trigger time.
    pub length: u32,
    /// Is the voice producing audio?
    pub active: bool,
    /// Trigger velocity (0-127).
    pub velocity: u8,
    /// Which volume control applies.
    pub source: TriggerSource,
    /// Loop between `loop_start` and `loop_end` instead of stopping.
    pub looping: bool,
    pub loop_start: u32,
    /// Exclusive end of the loop region.
    pub loop_end: u32,
    /// Playback rate ratio. Stored but not yet used by rendering.
    pub pitch: f32,
}

impl Voice {
    /// An inactive voice.
    pub const fn inert() -> Self {
        Self {
            pad: 0,
            position: 0,
            length: 0,
            active: false,
            velocity: MAX_VELOCITY,
            source: TriggerSource::Live,
            looping: false,
            loop_start: 0,
            loop_end: 0,
            pitch: 1.0,
        }
    }

    /// (Re)start the voice at the beginning of a buffer of `length` samples.
    pub fn start(&mut self, pad: u8, length: u32, velocity: u8, source: TriggerSource) {
        *self = Self {
            pad,
            length,
            active: length > 0,
            velocity: velocity.min(MAX_VELOCITY),
            source,
            loop_end: length,
            ..Self::inert()
        };
    }

    /// Configure looping. `end == 0` (or past the buffer) means the full length.
    pub fn set_loop(&mut self, enabled: bool, start: u32, end: u32) {
        let end = if end == 0 || end > self.length {
            self.length
        } else {
            end
        };
        self.looping = enabled;
        self.loop_start = start.min(self.length.saturating_sub(1));
        self.loop_end = end;
        // A shortened loop may leave the cursor past its end.
        if self.has_loop() && self.position >= self.loop_end {
            self.position = self.loop_start;
        }
    }

    /// Store the pitch ratio.
    pub fn set_pitch(&mut self, ratio: f32) {
        self.pitch = clamp_pitch(ratio);
    }

    /// Returns true if the voice will wrap instead of finishing.
    pub fn has_loop(&self) -> bool {
        self.looping && self.loop_end > self.loop_start
    }

    /// Deactivate the voice.
    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Add up to `left.len()` samples into the accumulators.
    ///
    /// The scaled value goes into both channels. Stops early when the
    /// buffer runs out and there is no loop.
    pub fn render(&mut self, data: &[i16], gain: u8, left: &mut [i32], right: &mut [i32]) {
        if !self.active {
            return;
        }
        let scale = self.velocity as i32 * gain as i32;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let sample = data.get(self.position as usize).copied().unwrap_or(0) as i32;
            let scaled = sample * scale / (MAX_VELOCITY as i32 * 100);
            *l += scaled;
            *r += scaled;

            self.position += 1;
            if self.has_loop() && self.position >= self.loop_end {
                self.position = self.loop_start;
            } else if self.position >= self.length {
                self.active = false;
                break;
            }
        }
    }
}

impl Default for Voice {
    fn default() -> Self {
        Self::inert()
    }
}
