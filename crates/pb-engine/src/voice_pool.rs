//! VoicePool: fixed voice slots plus the pad registration table.

use pb_ir::{SampleBuffer, TriggerSource, MAX_VOICES, NUM_PADS};

use crate::error::EngineError;
use crate::voice::{SourceGains, Voice};

/// Identifier for a voice slot in the pool.
pub type VoiceId = usize;

/// Slot reused when every voice is busy.
pub const STEAL_SLOT: VoiceId = 0;

/// Fixed pool of voices with one registered buffer per pad.
pub struct VoicePool {
    voices: [Voice; MAX_VOICES],
    pads: [Option<SampleBuffer>; NUM_PADS],
    steals: u64,
}

impl VoicePool {
    /// Create a pool with no pads registered.
    pub fn new() -> Self {
        Self {
            voices: [Voice::inert(); MAX_VOICES],
            pads: core::array::from_fn(|_| None),
            steals: 0,
        }
    }

    /// Bind a buffer to `pad`. Voices still playing the pad are stopped and
    /// the previous buffer, if any, is returned so it can be dropped
    /// somewhere other than the audio thread.
    pub fn register(
        &mut self,
        pad: u8,
        buffer: SampleBuffer,
    ) -> Result<Option<SampleBuffer>, EngineError> {
        let slot = self
            .pads
            .get_mut(pad as usize)
            .ok_or(EngineError::InvalidPad(pad as usize))?;
        let previous = slot.replace(buffer);
        self.silence_pad(pad);
        Ok(previous)
    }

    /// Clear `pad`, returning its buffer.
    pub fn unregister(&mut self, pad: u8) -> Result<Option<SampleBuffer>, EngineError> {
        let slot = self
            .pads
            .get_mut(pad as usize)
            .ok_or(EngineError::InvalidPad(pad as usize))?;
        let previous = slot.take();
        self.silence_pad(pad);
        Ok(previous)
    }

    /// Buffer registered on `pad`.
    pub fn sample(&self, pad: u8) -> Option<&SampleBuffer> {
        self.pads.get(pad as usize).and_then(|s| s.as_ref())
    }

    /// Start `pad` on the first free voice, or on [`STEAL_SLOT`] if none is free.
    pub fn trigger(
        &mut self,
        pad: u8,
        velocity: u8,
        source: TriggerSource,
    ) -> Result<VoiceId, EngineError> {
        let buffer = self
            .pads
            .get(pad as usize)
            .ok_or(EngineError::InvalidPad(pad as usize))?;
        let length = match buffer {
            Some(b) if !b.is_empty() => b.len().min(u32::MAX as usize) as u32,
            _ => return Err(EngineError::MissingSample(pad as usize)),
        };
        let id = self.allocate();
        self.voices[id].start(pad, length, velocity, source);
        Ok(id)
    }

    fn allocate(&mut self) -> VoiceId {
        match self.voices.iter().position(|v| !v.active) {
            Some(id) => id,
            None => {
                self.steals += 1;
                STEAL_SLOT
            }
        }
    }

    /// Stop every voice playing `pad`.
    pub fn stop(&mut self, pad: u8) -> Result<(), EngineError> {
        if pad as usize >= NUM_PADS {
            return Err(EngineError::InvalidPad(pad as usize));
        }
        self.silence_pad(pad);
        Ok(())
    }

    fn silence_pad(&mut self, pad: u8) {
        self.voices
            .iter_mut()
            .filter(|v| v.active && v.pad == pad)
            .for_each(Voice::stop);
    }

    /// Stop every voice.
    pub fn stop_all(&mut self) {
        self.voices.iter_mut().for_each(Voice::stop);
    }

    /// Configure looping on one voice.
    pub fn set_loop(
        &mut self,
        id: VoiceId,
        enabled: bool,
        start: u32,
        end: u32,
    ) -> Result<(), EngineError> {
        self.get_mut(id)?.set_loop(enabled, start, end);
        Ok(())
    }

    /// Store the pitch ratio of one voice.
    pub fn set_pitch(&mut self, id: VoiceId, ratio: f32) -> Result<(), EngineError> {
        self.get_mut(id)?.set_pitch(ratio);
        Ok(())
    }

    /// Get a reference to a voice.
    pub fn get(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.get(id)
    }

    fn get_mut(&mut self, id: VoiceId) -> Result<&mut Voice, EngineError> {
        self.voices.get_mut(id).ok_or(EngineError::InvalidVoice(id))
    }

    /// Count of voices currently producing audio.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    /// Number of triggers that had to steal a busy voice.
    pub fn steal_count(&self) -> u64 {
        self.steals
    }

    /// Add every active voice into the accumulators.
    pub fn render_all(&mut self, gains: &SourceGains, left: &mut [i32], right: &mut [i32]) {
        let pads = &self.pads;
        for voice in self.voices.iter_mut().filter(|v| v.active) {
            match pads.get(voice.pad as usize).and_then(|p| p.as_ref()) {
                Some(buffer) => voice.render(buffer.data(), gains.get(voice.source), left, right),
                None => voice.stop(),
            }
        }
    }
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(len: usize, value: i16) -> SampleBuffer {
        SampleBuffer::new("test", vec![value; len])
    }

    fn pool_with_pad(pad: u8, len: usize) -> VoicePool {
        let mut pool = VoicePool::new();
        pool.register(pad, buffer(len, 1000)).unwrap();
        pool
    }

    fn render(pool: &mut VoicePool, n: usize) -> Vec<i32> {
        let mut l = vec![0i32; n];
        let mut r = vec![0i32; n];
        pool.render_all(&SourceGains::default(), &mut l, &mut r);
        l
    }

    #[test]
    fn pool_new_is_empty() {
        let pool = VoicePool::new();
        assert_eq!(pool.active_count(), 0);
        assert!(pool.sample(0).is_none());
    }

    #[test]
    fn trigger_uses_first_free_voice() {
        let mut pool = pool_with_pad(3, 100);
        assert_eq!(pool.trigger(3, 127, TriggerSource::Live), Ok(0));
        assert_eq!(pool.trigger(3, 127, TriggerSource::Live), Ok(1));
        assert_eq!(pool.active_count(), 2);
        let v = pool.get(1).unwrap();
        assert_eq!((v.pad, v.position, v.length), (3, 0, 100));
    }

    #[test]
    fn full_pool_steals_slot_zero() {
        let mut pool = pool_with_pad(0, 100);
        for _ in 0..MAX_VOICES {
            pool.trigger(0, 127, TriggerSource::Live).unwrap();
        }
        render(&mut pool, 10);
        assert_eq!(pool.get(0).unwrap().position, 10);

        assert_eq!(pool.trigger(0, 90, TriggerSource::Live), Ok(STEAL_SLOT));
        let stolen = pool.get(STEAL_SLOT).unwrap();
        assert_eq!(stolen.position, 0);
        assert_eq!(stolen.velocity, 90);
        assert_eq!(pool.steal_count(), 1);
        assert_eq!(pool.active_count(), MAX_VOICES);
    }

    #[test]
    fn invalid_pad_leaves_pool_unchanged() {
        let mut pool = pool_with_pad(0, 10);
        pool.trigger(0, 127, TriggerSource::Live).unwrap();
        let before: Vec<Voice> = (0..MAX_VOICES).map(|i| *pool.get(i).unwrap()).collect();

        for pad in [NUM_PADS as u8, 200, u8::MAX] {
            assert_eq!(
                pool.trigger(pad, 127, TriggerSource::Live),
                Err(EngineError::InvalidPad(pad as usize))
            );
            assert!(pool.register(pad, buffer(4, 1)).is_err());
            assert!(pool.stop(pad).is_err());
        }

        let after: Vec<Voice> = (0..MAX_VOICES).map(|i| *pool.get(i).unwrap()).collect();
        assert_eq!(before, after);
        assert!(pool.sample(0).is_some());
    }

    #[test]
    fn missing_sample_is_a_silent_no_op() {
        let mut pool = VoicePool::new();
        assert_eq!(
            pool.trigger(5, 127, TriggerSource::Live),
            Err(EngineError::MissingSample(5))
        );
        assert_eq!(pool.active_count(), 0);
        assert_eq!(render(&mut pool, 4), vec![0; 4]);
    }

    #[test]
    fn stop_only_affects_that_pad() {
        let mut pool = pool_with_pad(0, 100);
        pool.register(1, buffer(100, 5)).unwrap();
        pool.trigger(0, 127, TriggerSource::Live).unwrap();
        pool.trigger(1, 127, TriggerSource::Live).unwrap();
        pool.trigger(0, 127, TriggerSource::Live).unwrap();

        pool.stop(0).unwrap();
        assert_eq!(pool.active_count(), 1);
        assert_eq!(pool.get(1).unwrap().pad, 1);

        pool.stop_all();
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn register_replaces_and_returns_previous() {
        let mut pool = pool_with_pad(2, 10);
        pool.trigger(2, 127, TriggerSource::Live).unwrap();
        let previous = pool.register(2, buffer(20, 7)).unwrap();
        assert_eq!(previous.map(|b| b.len()), Some(10));
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.sample(2).unwrap().len(), 20);

        let removed = pool.unregister(2).unwrap();
        assert_eq!(removed.map(|b| b.len()), Some(20));
        assert!(pool.sample(2).is_none());
    }

    #[test]
    fn set_loop_rejects_bad_voice() {
        let mut pool = pool_with_pad(0, 10);
        assert_eq!(
            pool.set_loop(MAX_VOICES, true, 0, 0),
            Err(EngineError::InvalidVoice(MAX_VOICES))
        );
        assert!(pool.set_pitch(99, 1.0).is_err());
    }

    #[test]
    fn voices_sum_into_accumulators() {
        let mut pool = pool_with_pad(0, 8);
        pool.trigger(0, 127, TriggerSource::Live).unwrap();
        pool.trigger(0, 127, TriggerSource::Live).unwrap();
        assert_eq!(render(&mut pool, 2), vec![2000, 2000]);
    }

    #[test]
    fn finished_voices_free_their_slot() {
        let mut pool = pool_with_pad(0, 4);
        pool.trigger(0, 127, TriggerSource::Live).unwrap();
        render(&mut pool, 8);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.trigger(0, 127, TriggerSource::Live), Ok(0));
    }
}
