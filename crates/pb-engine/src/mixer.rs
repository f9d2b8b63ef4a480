//! Main render engine: voice mixing, master volume, effects, capture.

use alloc::sync::Arc;
use alloc::vec::Vec;
use pb_ir::{
    clamp_volume, Command, FxParams, SampleBuffer, TriggerSource, MAX_BLOCK_FRAMES, NUM_PADS,
};

use crate::capture::CaptureRing;
use crate::effects::EffectsChain;
use crate::error::EngineError;
use crate::frame::Frame;
use crate::voice::SourceGains;
use crate::voice_pool::{VoiceId, VoicePool};

/// Master volume at power-up.
pub const DEFAULT_MASTER_VOLUME: u8 = 80;

/// The audio-thread half of the machine.
///
/// Owns the voices, the effects chain and the mix accumulators. Nothing in
/// [`Engine::render_block`] or [`Engine::apply`] allocates or blocks.
pub struct Engine {
    pool: VoicePool,
    fx: EffectsChain,
    gains: SourceGains,
    master_volume: u8,
    capture: Arc<CaptureRing>,
    acc_left: [i32; MAX_BLOCK_FRAMES],
    acc_right: [i32; MAX_BLOCK_FRAMES],
}

impl Engine {
    /// Engine with its own capture ring.
    pub fn new() -> Self {
        Self::with_capture(Arc::new(CaptureRing::new()))
    }

    /// Engine writing into a capture ring shared with the control side.
    pub fn with_capture(capture: Arc<CaptureRing>) -> Self {
        Self {
            pool: VoicePool::new(),
            fx: EffectsChain::new(),
            gains: SourceGains::default(),
            master_volume: DEFAULT_MASTER_VOLUME,
            capture,
            acc_left: [0; MAX_BLOCK_FRAMES],
            acc_right: [0; MAX_BLOCK_FRAMES],
        }
    }

    /// Apply a control command.
    ///
    /// Returns the buffer a `Register`/`Unregister` displaced. A buffer in a
    /// rejected `Register` is dropped here, so the audio thread should use
    /// [`Engine::apply_retiring`] instead.
    pub fn apply(&mut self, command: Command) -> Result<Option<SampleBuffer>, EngineError> {
        let mut retired = None;
        self.apply_retiring(command, |buffer| retired = Some(buffer))?;
        Ok(retired)
    }

    /// Apply a control command, passing every buffer that leaves the engine
    /// to `retire`: the one a `Register`/`Unregister` displaced, or the
    /// incoming one when a `Register` is rejected.
    pub fn apply_retiring(
        &mut self,
        command: Command,
        mut retire: impl FnMut(SampleBuffer),
    ) -> Result<(), EngineError> {
        match command {
            Command::Trigger {
                pad,
                velocity,
                source,
                looped,
            } => {
                let id = self.trigger(pad, velocity, source)?;
                if looped {
                    self.pool.set_loop(id, true, 0, 0)?;
                }
            }
            Command::Stop { pad } => self.pool.stop(pad)?,
            Command::StopAll => self.pool.stop_all(),
            Command::SetLoop {
                voice,
                enabled,
                start,
                end,
            } => self.pool.set_loop(voice, enabled, start, end)?,
            Command::SetPitch { voice, ratio } => self.pool.set_pitch(voice, ratio)?,
            Command::Register { pad, buffer } => {
                if pad as usize >= NUM_PADS {
                    retire(buffer);
                    return Err(EngineError::InvalidPad(pad as usize));
                }
                if let Some(previous) = self.pool.register(pad, buffer)? {
                    retire(previous);
                }
            }
            Command::Unregister { pad } => {
                if let Some(previous) = self.pool.unregister(pad)? {
                    retire(previous);
                }
            }
            Command::SetFilter(kind) => self.fx.set_filter(kind),
            Command::SetCutoff(hz) => self.fx.set_cutoff(hz),
            Command::SetResonance(q) => self.fx.set_resonance(q),
            Command::SetBitDepth(bits) => self.fx.set_bit_depth(bits),
            Command::SetDistortion(amount) => self.fx.set_distortion(amount),
            Command::SetDecimation(rate) => self.fx.set_decimation(rate),
            Command::SetMasterVolume(volume) => self.set_master_volume(volume),
            Command::SetSourceVolume { source, volume } => self.set_source_volume(source, volume),
        }
        Ok(())
    }

    /// Start a voice on `pad`.
    pub fn trigger(
        &mut self,
        pad: u8,
        velocity: u8,
        source: TriggerSource,
    ) -> Result<VoiceId, EngineError> {
        self.pool.trigger(pad, velocity, source)
    }

    /// Voice pool, for inspection.
    pub fn voices(&self) -> &VoicePool {
        &self.pool
    }

    /// Effects chain, for inspection.
    pub fn effects(&self) -> &EffectsChain {
        &self.fx
    }

    /// Apply a full effects configuration.
    pub fn set_effects(&mut self, params: FxParams) {
        let params = params.clamped();
        self.fx.set_filter(params.filter);
        self.fx.set_cutoff(params.cutoff);
        self.fx.set_resonance(params.resonance);
        self.fx.set_bit_depth(params.bit_depth);
        self.fx.set_distortion(params.distortion);
        self.fx.set_decimation(params.decimate_to);
    }

    pub fn master_volume(&self) -> u8 {
        self.master_volume
    }

    /// Master volume in percent, clamped to 0-100.
    pub fn set_master_volume(&mut self, volume: u8) {
        self.master_volume = clamp_volume(volume);
    }

    pub fn source_volume(&self, source: TriggerSource) -> u8 {
        self.gains.get(source)
    }

    pub fn set_source_volume(&mut self, source: TriggerSource, volume: u8) {
        self.gains.set(source, volume);
    }

    /// Shared capture ring.
    pub fn capture(&self) -> &Arc<CaptureRing> {
        &self.capture
    }

    /// Render `out.len()` frames.
    pub fn render_block(&mut self, out: &mut [Frame]) {
        for chunk in out.chunks_mut(MAX_BLOCK_FRAMES) {
            self.render_chunk(chunk);
        }
    }

    fn render_chunk(&mut self, out: &mut [Frame]) {
        let n = out.len();
        let left = &mut self.acc_left[..n];
        let right = &mut self.acc_right[..n];
        left.fill(0);
        right.fill(0);

        self.pool.render_all(&self.gains, left, right);

        let volume = self.master_volume as i32;
        for ((frame, &l), &r) in out.iter_mut().zip(left.iter()).zip(right.iter()) {
            let mixed = Frame::from_wide(l * volume / 100, r * volume / 100);
            let processed = self.fx.process_frame(mixed);
            self.capture.push(processed.left);
            *frame = processed;
        }
    }

    /// Render `count` frames into a new buffer. Allocates; offline use only.
    pub fn render_frames(&mut self, count: usize) -> Vec<Frame> {
        let mut frames = alloc::vec![Frame::silence(); count];
        self.render_block(&mut frames);
        frames
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pb_ir::MAX_VOICES;

    fn engine_with_pad(pad: u8, data: Vec<i16>) -> Engine {
        let mut engine = Engine::new();
        engine.set_master_volume(100);
        let displaced = engine
            .apply(Command::Register {
                pad,
                buffer: SampleBuffer::new("pad", data),
            })
            .unwrap();
        assert!(displaced.is_none());
        engine
    }

    fn trigger(engine: &mut Engine, pad: u8, velocity: u8) {
        engine
            .apply(Command::Trigger {
                pad,
                velocity,
                source: TriggerSource::Live,
                looped: false,
            })
            .unwrap();
    }

    #[test]
    fn idle_engine_renders_silence() {
        let mut engine = Engine::new();
        let frames = engine.render_frames(256);
        assert!(frames.iter().all(|f| *f == Frame::silence()));
    }

    #[test]
    fn output_is_stereo_duplicated() {
        let mut engine = engine_with_pad(0, (0..64).map(|i| i * 100).collect());
        trigger(&mut engine, 0, 127);
        for f in engine.render_frames(64) {
            assert_eq!(f.left, f.right);
        }
    }

    #[test]
    fn master_volume_scales_mix() {
        let mut engine = engine_with_pad(0, vec![10_000; 16]);
        engine.set_master_volume(80);
        trigger(&mut engine, 0, 127);
        let frames = engine.render_frames(4);
        assert_eq!(frames[0], Frame::mono(8_000));
    }

    #[test]
    fn default_master_volume_is_eighty() {
        assert_eq!(Engine::new().master_volume(), 80);
    }

    #[test]
    fn loud_voices_clamp_instead_of_wrapping() {
        let mut engine = engine_with_pad(0, vec![i16::MAX; 16]);
        engine
            .apply(Command::Register {
                pad: 1,
                buffer: SampleBuffer::new("neg", vec![i16::MIN; 16]),
            })
            .unwrap();
        trigger(&mut engine, 0, 127);
        trigger(&mut engine, 0, 127);
        let frames = engine.render_frames(4);
        assert_eq!(frames[0], Frame::mono(i16::MAX));

        engine.apply(Command::StopAll).unwrap();
        trigger(&mut engine, 1, 127);
        trigger(&mut engine, 1, 127);
        let frames = engine.render_frames(4);
        assert_eq!(frames[0], Frame::mono(i16::MIN));
    }

    #[test]
    fn stop_takes_effect_on_next_block() {
        let mut engine = engine_with_pad(0, vec![1000; 1000]);
        trigger(&mut engine, 0, 127);
        assert!(engine.render_frames(32).iter().all(|f| f.left == 1000));
        engine.apply(Command::Stop { pad: 0 }).unwrap();
        assert!(engine.render_frames(32).iter().all(|f| f.left == 0));
    }

    #[test]
    fn looped_trigger_sustains() {
        let mut engine = engine_with_pad(0, vec![500; 10]);
        engine
            .apply(Command::Trigger {
                pad: 0,
                velocity: 127,
                source: TriggerSource::Live,
                looped: true,
            })
            .unwrap();
        let frames = engine.render_frames(100);
        assert!(frames.iter().all(|f| f.left == 500));
        assert_eq!(engine.voices().active_count(), 1);
    }

    #[test]
    fn source_volume_applies_per_trigger_source() {
        let mut engine = engine_with_pad(0, vec![1000; 16]);
        engine
            .apply(Command::SetSourceVolume {
                source: TriggerSource::Sequencer,
                volume: 50,
            })
            .unwrap();
        engine
            .apply(Command::Trigger {
                pad: 0,
                velocity: 127,
                source: TriggerSource::Sequencer,
                looped: false,
            })
            .unwrap();
        assert_eq!(engine.render_frames(1)[0], Frame::mono(500));
        assert_eq!(engine.source_volume(TriggerSource::Live), 100);
    }

    #[test]
    fn rejected_commands_report_errors() {
        let mut engine = Engine::new();
        assert!(matches!(
            engine.apply(Command::Stop { pad: 99 }),
            Err(EngineError::InvalidPad(99))
        ));
        assert!(matches!(
            engine.apply(Command::SetLoop {
                voice: MAX_VOICES,
                enabled: true,
                start: 0,
                end: 0
            }),
            Err(EngineError::InvalidVoice(_))
        ));
        assert!(matches!(
            engine.apply(Command::Trigger {
                pad: 3,
                velocity: 127,
                source: TriggerSource::Live,
                looped: false
            }),
            Err(EngineError::MissingSample(3))
        ));
    }

    #[test]
    fn re_register_hands_back_old_buffer() {
        let mut engine = engine_with_pad(4, vec![1; 8]);
        let old = engine
            .apply(Command::Register {
                pad: 4,
                buffer: SampleBuffer::new("new", vec![2; 8]),
            })
            .unwrap();
        assert_eq!(old.map(|b| b.data()[0]), Some(1));
    }

    #[test]
    fn rejected_register_hands_buffer_back() {
        let mut engine = Engine::new();
        let mut returned = Vec::new();
        let result = engine.apply_retiring(
            Command::Register {
                pad: NUM_PADS as u8,
                buffer: SampleBuffer::new("stray", vec![3; 4]),
            },
            |buffer| returned.push(buffer),
        );
        assert_eq!(result, Err(EngineError::InvalidPad(NUM_PADS)));
        assert_eq!(returned.len(), 1);
        assert_eq!(returned[0].name.as_str(), "stray");
        assert!(engine.voices().sample(0).is_none());
    }

    #[test]
    fn effects_run_after_master_volume() {
        let mut engine = engine_with_pad(0, vec![0x1234; 16]);
        engine.apply(Command::SetBitDepth(8)).unwrap();
        trigger(&mut engine, 0, 127);
        assert_eq!(engine.render_frames(1)[0], Frame::mono(0x1200));
    }

    #[test]
    fn long_blocks_are_chunked() {
        let mut engine = engine_with_pad(0, vec![700; MAX_BLOCK_FRAMES * 3]);
        trigger(&mut engine, 0, 127);
        let frames = engine.render_frames(MAX_BLOCK_FRAMES * 2 + 5);
        assert!(frames.iter().all(|f| f.left == 700));
    }

    #[test]
    fn capture_sees_rendered_output() {
        let mut engine = engine_with_pad(0, vec![4000; 512]);
        trigger(&mut engine, 0, 127);
        engine.render_frames(300);
        assert!(engine.capture().snapshot().iter().all(|&s| s == 4000));
    }
}
