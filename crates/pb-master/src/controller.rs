//! The composition root: owns the sequencer, the command queue into the
//! engine, and the threads that drive them.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use arrayvec::ArrayString;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use pb_audio::{AudioError, AudioOutput, CpalOutput};
use pb_engine::{Engine, EngineError, Frame, LoopState, Sequencer, Visualization};
use pb_formats::FormatError;
use pb_ir::{
    clamp_bit_depth, clamp_cutoff, clamp_decimation, clamp_distortion, clamp_resonance,
    clamp_tempo, clamp_volume, Command, FilterKind, FxParams, Pattern, SampleBuffer,
    TriggerSource, MAX_VELOCITY, NATIVE_SAMPLE_RATE, NUM_PADS, NUM_PATTERNS,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigError};
use crate::load_meter::LoadMeter;
use crate::presets::{PatternCycle, PRESETS};
use crate::runtime::{audio_thread, control_thread, AudioJob, ControlJob, Shared};
use crate::thread_priority::{audio_thread_priority, rt_audio_enabled};

/// Capacity of the control-to-audio command queue.
pub const COMMAND_QUEUE_LEN: usize = 1024;

/// Frames the cpal ring holds between render thread and device.
const OUTPUT_BUFFER_FRAMES: usize = 2048;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("command queue is full")]
    QueueFull,
    #[error("audio is running")]
    Running,
    #[error("audio thread exited during startup")]
    AudioThreadLost,
    #[error("could not spawn thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Snapshot of the engine counters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EngineStats {
    pub active_voices: usize,
    pub voice_steals: u64,
    pub rejected_commands: u64,
    pub dropped_commands: u64,
    pub lost_buffers: u64,
    pub load_percent: f32,
    pub peak_load_percent: f32,
}

/// Control-side copy of what was last sent to the engine.
#[derive(Clone, Debug)]
struct Mirror {
    fx: FxParams,
    master_volume: u8,
    sequencer_volume: u8,
    live_volume: u8,
    pads: [Option<ArrayString<32>>; NUM_PADS],
}

impl Default for Mirror {
    fn default() -> Self {
        Self {
            fx: FxParams::default(),
            master_volume: pb_engine::DEFAULT_MASTER_VOLUME,
            sequencer_volume: 100,
            live_volume: 100,
            pads: [None; NUM_PADS],
        }
    }
}

struct Runtime {
    audio: JoinHandle<Engine>,
    control: JoinHandle<()>,
}

/// Headless drum machine.
///
/// All methods take `&self`; the controller can be shared between threads.
/// The engine lives on the audio thread while running and inside the
/// controller otherwise, where [`Controller::render`] drives it offline.
pub struct Controller {
    sequencer: Arc<Mutex<Sequencer>>,
    cycle: Arc<Mutex<PatternCycle>>,
    commands: Sender<Command>,
    command_rx: Receiver<Command>,
    retired_tx: Sender<SampleBuffer>,
    retired_rx: Receiver<SampleBuffer>,
    shared: Arc<Shared>,
    mirror: Mutex<Mirror>,
    engine: Mutex<Option<Engine>>,
    runtime: Mutex<Option<Runtime>>,
    block_frames: usize,
}

impl Controller {
    pub fn new() -> Self {
        Self::with_block_frames(pb_ir::BLOCK_FRAMES)
    }

    /// Controller rendering `block_frames` per audio block.
    pub fn with_block_frames(block_frames: usize) -> Self {
        let block_frames = block_frames.clamp(1, pb_ir::MAX_BLOCK_FRAMES);
        let (commands, command_rx) = bounded(COMMAND_QUEUE_LEN);
        let (retired_tx, retired_rx) = bounded(COMMAND_QUEUE_LEN);
        let shared = Arc::new(Shared::new(LoadMeter::new(
            NATIVE_SAMPLE_RATE,
            block_frames,
        )));
        let engine = Engine::with_capture(shared.capture.clone());

        let mut sequencer = Sequencer::new();
        let tx = commands.clone();
        let trigger_shared = shared.clone();
        sequencer.set_trigger_callback(Box::new(move |track, velocity| {
            let command = Command::Trigger {
                pad: track,
                velocity,
                source: TriggerSource::Sequencer,
                looped: false,
            };
            if tx.try_send(command).is_err() {
                trigger_shared
                    .dropped_commands
                    .fetch_add(1, Ordering::Relaxed);
            }
        }));

        let controller = Self {
            sequencer: Arc::new(Mutex::new(sequencer)),
            cycle: Arc::new(Mutex::new(PatternCycle::disabled())),
            commands,
            command_rx,
            retired_tx,
            retired_rx,
            shared,
            mirror: Mutex::new(Mirror::default()),
            engine: Mutex::new(Some(engine)),
            runtime: Mutex::new(None),
            block_frames,
        };
        controller.set_step_listener(|_| {});
        controller
    }

    /// Build a controller from a configuration: tempo, volumes, effects,
    /// presets, pattern cycling and pad samples.
    pub fn from_config(config: &Config) -> Result<Self, ControllerError> {
        let controller = Self::with_block_frames(config.block_frames());

        if config.presets {
            controller.load_presets()?;
        }
        controller.set_cycle_bars(config.cycle_bars);
        controller.set_tempo(config.tempo);
        controller.select_pattern(config.pattern.min(NUM_PATTERNS - 1))?;
        controller.set_master_volume(config.master_volume)?;
        controller.set_sequencer_volume(config.sequencer_volume)?;
        controller.set_live_volume(config.live_volume)?;
        controller.set_effects(config.fx)?;

        for (pad, path) in config.pad_paths() {
            controller.load_pad_file(pad, &path)?;
        }
        Ok(controller)
    }

    fn send(&self, command: Command) -> Result<(), ControllerError> {
        match self.commands.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.shared.dropped_commands.fetch_add(1, Ordering::Relaxed);
                warn!("Command queue full; command dropped");
                Err(ControllerError::QueueFull)
            }
        }
    }

    fn check_pad(pad: u8) -> Result<(), ControllerError> {
        if pad as usize >= NUM_PADS {
            warn!(pad, "Pad index out of range");
            return Err(EngineError::InvalidPad(pad as usize).into());
        }
        Ok(())
    }

    // --- Samples ---

    /// Bind `buffer` to `pad`, replacing and silencing whatever was there.
    pub fn load_pad(&self, pad: u8, buffer: SampleBuffer) -> Result<(), ControllerError> {
        Self::check_pad(pad)?;
        let name = buffer.name;
        info!(pad, name = name.as_str(), frames = buffer.len(), "Loading pad");
        self.send(Command::Register { pad, buffer })?;
        self.mirror.lock().pads[pad as usize] = Some(name);
        Ok(())
    }

    /// Decode a WAV file and bind it to `pad`.
    pub fn load_pad_file(&self, pad: u8, path: &Path) -> Result<(), ControllerError> {
        let buffer = pb_formats::load_wav_file(path)?;
        self.load_pad(pad, buffer)
    }

    pub fn unload_pad(&self, pad: u8) -> Result<(), ControllerError> {
        Self::check_pad(pad)?;
        self.send(Command::Unregister { pad })?;
        self.mirror.lock().pads[pad as usize] = None;
        Ok(())
    }

    /// Name of the sample on `pad`, if any.
    pub fn pad_name(&self, pad: u8) -> Option<ArrayString<32>> {
        self.mirror.lock().pads.get(pad as usize).copied().flatten()
    }

    // --- Live pads ---

    /// Play `pad` as a performer would. A looping track restarts its
    /// sustained loop, a paused loop silences it, otherwise it plays once.
    pub fn trigger_pad(&self, pad: u8, velocity: u8) -> Result<(), ControllerError> {
        Self::check_pad(pad)?;
        let velocity = velocity.min(MAX_VELOCITY);
        let state = self.sequencer.lock().loop_state(pad as usize);
        let command = match state {
            LoopState::Looping => {
                // Restart the loop rather than layering another voice.
                self.send(Command::Stop { pad })?;
                Command::Trigger {
                    pad,
                    velocity,
                    source: TriggerSource::Live,
                    looped: true,
                }
            }
            LoopState::Paused => Command::Stop { pad },
            LoopState::Idle => Command::Trigger {
                pad,
                velocity,
                source: TriggerSource::Live,
                looped: false,
            },
        };
        self.send(command)
    }

    pub fn stop_pad(&self, pad: u8) -> Result<(), ControllerError> {
        Self::check_pad(pad)?;
        self.send(Command::Stop { pad })
    }

    pub fn stop_all(&self) -> Result<(), ControllerError> {
        self.send(Command::StopAll)
    }

    /// Flip the live loop of `track`. Leaving a loop silences the pad.
    pub fn toggle_loop(&self, track: usize) -> Result<LoopState, ControllerError> {
        let state = self.sequencer.lock().toggle_loop(track)?;
        debug!(track, ?state, "Loop toggled");
        if state == LoopState::Idle {
            self.send(Command::Stop { pad: track as u8 })?;
        }
        Ok(state)
    }

    /// Pause or resume the live loop of `track`. Pausing silences the pad;
    /// resuming restarts it as a sustained loop at full velocity.
    pub fn pause_loop(&self, track: usize) -> Result<LoopState, ControllerError> {
        let state = self.sequencer.lock().pause_loop(track)?;
        debug!(track, ?state, "Loop paused");
        match state {
            LoopState::Paused => self.send(Command::Stop { pad: track as u8 })?,
            LoopState::Looping => self.send(Command::Trigger {
                pad: track as u8,
                velocity: MAX_VELOCITY,
                source: TriggerSource::Live,
                looped: true,
            })?,
            LoopState::Idle => {}
        }
        Ok(state)
    }

    pub fn loop_state(&self, track: usize) -> LoopState {
        self.sequencer.lock().loop_state(track)
    }

    // --- Effects and volume ---

    pub fn set_filter(&self, kind: FilterKind) -> Result<(), ControllerError> {
        debug!(?kind, "Filter");
        self.mirror.lock().fx.filter = kind;
        self.send(Command::SetFilter(kind))
    }

    pub fn set_cutoff(&self, hz: f32) -> Result<(), ControllerError> {
        let hz = clamp_cutoff(hz);
        debug!(hz, "Cutoff");
        self.mirror.lock().fx.cutoff = hz;
        self.send(Command::SetCutoff(hz))
    }

    pub fn set_resonance(&self, q: f32) -> Result<(), ControllerError> {
        let q = clamp_resonance(q);
        debug!(q, "Resonance");
        self.mirror.lock().fx.resonance = q;
        self.send(Command::SetResonance(q))
    }

    pub fn set_bit_depth(&self, bits: u8) -> Result<(), ControllerError> {
        let bits = clamp_bit_depth(bits);
        debug!(bits, "Bit depth");
        self.mirror.lock().fx.bit_depth = bits;
        self.send(Command::SetBitDepth(bits))
    }

    pub fn set_distortion(&self, amount: f32) -> Result<(), ControllerError> {
        let amount = clamp_distortion(amount);
        debug!(amount, "Distortion");
        self.mirror.lock().fx.distortion = amount;
        self.send(Command::SetDistortion(amount))
    }

    pub fn set_decimation(&self, rate: u32) -> Result<(), ControllerError> {
        let rate = clamp_decimation(rate);
        debug!(rate, "Decimation");
        self.mirror.lock().fx.decimate_to = rate;
        self.send(Command::SetDecimation(rate))
    }

    /// Apply every effect parameter at once.
    pub fn set_effects(&self, fx: FxParams) -> Result<(), ControllerError> {
        let fx = fx.clamped();
        self.set_filter(fx.filter)?;
        self.set_cutoff(fx.cutoff)?;
        self.set_resonance(fx.resonance)?;
        self.set_bit_depth(fx.bit_depth)?;
        self.set_distortion(fx.distortion)?;
        self.set_decimation(fx.decimate_to)
    }

    pub fn effects(&self) -> FxParams {
        self.mirror.lock().fx
    }

    pub fn set_master_volume(&self, volume: u8) -> Result<(), ControllerError> {
        let volume = clamp_volume(volume);
        debug!(volume, "Master volume");
        self.mirror.lock().master_volume = volume;
        self.send(Command::SetMasterVolume(volume))
    }

    pub fn master_volume(&self) -> u8 {
        self.mirror.lock().master_volume
    }

    pub fn set_sequencer_volume(&self, volume: u8) -> Result<(), ControllerError> {
        let volume = clamp_volume(volume);
        debug!(volume, "Sequencer volume");
        self.mirror.lock().sequencer_volume = volume;
        self.send(Command::SetSourceVolume {
            source: TriggerSource::Sequencer,
            volume,
        })
    }

    pub fn sequencer_volume(&self) -> u8 {
        self.mirror.lock().sequencer_volume
    }

    pub fn set_live_volume(&self, volume: u8) -> Result<(), ControllerError> {
        let volume = clamp_volume(volume);
        debug!(volume, "Live volume");
        self.mirror.lock().live_volume = volume;
        self.send(Command::SetSourceVolume {
            source: TriggerSource::Live,
            volume,
        })
    }

    pub fn live_volume(&self) -> u8 {
        self.mirror.lock().live_volume
    }

    // --- Sequencer ---

    /// Start the transport from step 0.
    pub fn play(&self) {
        info!("Play");
        self.sequencer.lock().start();
    }

    /// Stop the transport and silence every voice.
    pub fn stop(&self) -> Result<(), ControllerError> {
        info!("Stop");
        self.sequencer.lock().stop();
        self.send(Command::StopAll)
    }

    pub fn is_playing(&self) -> bool {
        self.sequencer.lock().is_playing()
    }

    pub fn set_tempo(&self, bpm: f32) {
        let bpm = clamp_tempo(bpm);
        debug!(bpm, "Tempo");
        self.sequencer.lock().set_tempo(bpm);
    }

    pub fn tempo(&self) -> f32 {
        self.sequencer.lock().tempo()
    }

    pub fn select_pattern(&self, index: usize) -> Result<(), ControllerError> {
        self.sequencer.lock().select_pattern(index).map_err(|e| {
            warn!(index, "Pattern index out of range");
            e.into()
        })
    }

    /// Switch pattern at the end of the current bar.
    pub fn queue_pattern(&self, index: usize) -> Result<(), ControllerError> {
        Ok(self.sequencer.lock().queue_pattern(index)?)
    }

    pub fn current_pattern(&self) -> u8 {
        self.sequencer.lock().current_pattern()
    }

    /// Last step reported by the sequencer.
    pub fn current_step(&self) -> u8 {
        self.shared.step.load(Ordering::Relaxed)
    }

    pub fn bars_played(&self) -> u32 {
        self.sequencer.lock().bars_played()
    }

    pub fn pattern(&self, index: usize) -> Option<Pattern> {
        self.sequencer.lock().pattern(index).copied()
    }

    pub fn load_pattern(&self, index: usize, pattern: Pattern) -> Result<(), ControllerError> {
        Ok(self.sequencer.lock().load_pattern(index, pattern)?)
    }

    pub fn clear_pattern(&self, index: usize) -> Result<(), ControllerError> {
        Ok(self.sequencer.lock().clear_pattern(index)?)
    }

    /// Load the stock grooves into the first pattern slots.
    pub fn load_presets(&self) -> Result<(), ControllerError> {
        let mut seq = self.sequencer.lock();
        for (index, preset) in PRESETS.iter().enumerate() {
            seq.load_pattern(index, preset.pattern())?;
        }
        info!(count = PRESETS.len(), "Loaded preset patterns");
        Ok(())
    }

    /// Cycle through the preset slots every `bars` bars; `None` stops cycling.
    pub fn set_cycle_bars(&self, bars: Option<u32>) {
        *self.cycle.lock() = PatternCycle::new(bars, PRESETS.len());
    }

    pub fn set_step(&self, track: usize, step: usize, active: bool) -> Result<(), ControllerError> {
        Ok(self.sequencer.lock().set_step(track, step, active)?)
    }

    pub fn step(&self, track: usize, step: usize) -> bool {
        self.sequencer.lock().step(track, step)
    }

    pub fn set_step_velocity(
        &self,
        track: usize,
        step: usize,
        velocity: u8,
    ) -> Result<(), ControllerError> {
        Ok(self
            .sequencer
            .lock()
            .set_step_velocity(track, step, velocity)?)
    }

    pub fn step_velocity(&self, track: usize, step: usize) -> u8 {
        self.sequencer.lock().step_velocity(track, step)
    }

    pub fn mute_track(&self, track: usize, muted: bool) -> Result<(), ControllerError> {
        Ok(self.sequencer.lock().mute_track(track, muted)?)
    }

    pub fn is_muted(&self, track: usize) -> bool {
        self.sequencer.lock().is_muted(track)
    }

    /// Call `listener` with every new step. It runs on the thread that
    /// advances the sequencer with the sequencer locked, so it must not call
    /// back into the controller.
    pub fn set_step_listener(&self, mut listener: impl FnMut(u8) + Send + 'static) {
        let shared = self.shared.clone();
        self.sequencer
            .lock()
            .set_step_callback(Box::new(move |step| {
                shared.step.store(step, Ordering::Relaxed);
                listener(step);
            }));
    }

    // --- Diagnostics ---

    pub fn stats(&self) -> EngineStats {
        let s = &self.shared;
        EngineStats {
            active_voices: s.active_voices.load(Ordering::Relaxed),
            voice_steals: s.voice_steals.load(Ordering::Relaxed),
            rejected_commands: s.rejected_commands.load(Ordering::Relaxed),
            dropped_commands: s.dropped_commands.load(Ordering::Relaxed),
            lost_buffers: s.lost_buffers.load(Ordering::Relaxed),
            load_percent: s.load.percent(),
            peak_load_percent: s.load.peak_percent(),
        }
    }

    /// Spectrum and waveform of the most recent output.
    pub fn visualization(&self) -> Visualization {
        self.shared.capture.visualization()
    }

    // --- Real-time playback ---

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Start the audio and control threads on the default cpal device.
    pub fn start(&self) -> Result<(), ControllerError> {
        self.start_with(|rate| CpalOutput::open(rate, OUTPUT_BUFFER_FRAMES))
    }

    /// Start the audio and control threads. `factory` runs on the audio
    /// thread and opens the output there.
    pub fn start_with<O, F>(&self, factory: F) -> Result<(), ControllerError>
    where
        O: AudioOutput,
        F: FnOnce(u32) -> Result<O, AudioError> + Send + 'static,
    {
        let mut runtime = self.runtime.lock();
        if runtime.is_some() {
            return Err(ControllerError::Running);
        }
        let engine = self.engine.lock().take().ok_or(ControllerError::Running)?;

        self.shared.audio_failed.store(false, Ordering::Release);
        self.shared.load.reset();
        self.shared.running.store(true, Ordering::Release);

        let (ready_tx, ready_rx) = bounded(1);
        let job = AudioJob {
            engine,
            commands: self.command_rx.clone(),
            retired: self.retired_tx.clone(),
            shared: self.shared.clone(),
            block_frames: self.block_frames,
            priority: audio_thread_priority(),
            rt_audio: rt_audio_enabled(),
        };
        let audio = std::thread::Builder::new()
            .name("padbox-audio".into())
            .spawn(move || audio_thread(job, factory, ready_tx))
            .map_err(|e| {
                self.shared.running.store(false, Ordering::Release);
                ControllerError::Spawn(e)
            })?;

        match ready_rx.recv().unwrap_or(Err(AudioError::NotRunning)) {
            Ok(report) => report.log(),
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                let engine = audio.join().map_err(|_| ControllerError::AudioThreadLost)?;
                *self.engine.lock() = Some(engine);
                return Err(e.into());
            }
        }

        let job = ControlJob {
            sequencer: self.sequencer.clone(),
            cycle: self.cycle.clone(),
            retired: self.retired_rx.clone(),
            shared: self.shared.clone(),
        };
        let control = match std::thread::Builder::new()
            .name("padbox-control".into())
            .spawn(move || control_thread(job))
        {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                if let Ok(engine) = audio.join() {
                    *self.engine.lock() = Some(engine);
                }
                return Err(ControllerError::Spawn(e));
            }
        };

        info!(block_frames = self.block_frames, "Audio started");
        *runtime = Some(Runtime { audio, control });
        Ok(())
    }

    /// Stop both threads and take the engine back. No-op when not running.
    pub fn shutdown(&self) -> Result<(), ControllerError> {
        let Some(runtime) = self.runtime.lock().take() else {
            return Ok(());
        };
        self.shared.running.store(false, Ordering::Release);
        let _ = runtime.control.join();
        let engine = runtime
            .audio
            .join()
            .map_err(|_| ControllerError::AudioThreadLost)?;
        *self.engine.lock() = Some(engine);
        self.retired_rx.try_iter().for_each(drop);
        info!("Audio stopped");
        Ok(())
    }

    // --- Offline rendering ---

    /// Render `frames` frames without threads: the sequencer is advanced by
    /// exactly one block's worth of time before each block is rendered.
    pub fn render(&self, frames: usize) -> Result<Vec<Frame>, ControllerError> {
        let mut guard = self.engine.lock();
        let engine = guard.as_mut().ok_or(ControllerError::Running)?;

        let rate = NATIVE_SAMPLE_RATE as u64;
        let mut out = vec![Frame::silence(); frames];
        let mut rendered: u64 = 0;
        let mut clock_us: u64 = 0;

        for block in out.chunks_mut(self.block_frames) {
            rendered += block.len() as u64;
            let target_us = rendered * 1_000_000 / rate;
            {
                let mut seq = self.sequencer.lock();
                seq.advance(Duration::from_micros(target_us - clock_us));
                self.cycle.lock().poll(&mut seq);
            }
            clock_us = target_us;

            self.shared
                .drain_commands(engine, &self.command_rx, &self.retired_tx);
            engine.render_block(block);
            self.shared.publish(engine);
            self.retired_rx.try_iter().for_each(drop);
        }
        Ok(out)
    }

    /// Offline render encoded as a 16-bit stereo WAV file.
    pub fn render_wav(&self, frames: usize) -> Result<Vec<u8>, ControllerError> {
        let frames = self.render(frames)?;
        Ok(pb_formats::frames_to_wav(&frames, NATIVE_SAMPLE_RATE))
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pb_audio::NullOutput;

    fn controller_with_pads() -> Controller {
        let c = Controller::new();
        for pad in 0..NUM_PADS as u8 {
            c.load_pad(pad, SampleBuffer::new("click", vec![10_000; 400]))
                .unwrap();
        }
        c.set_master_volume(100).unwrap();
        c
    }

    #[test]
    fn offline_render_plays_sequenced_steps() {
        let c = controller_with_pads();
        c.set_step(0, 0, true).unwrap();
        c.set_tempo(120.0);
        c.play();
        let frames = c.render(1_000).unwrap();
        assert!(frames[0].left > 0);
        assert!(frames[999].left == 0);
        assert_eq!(c.current_step(), 0);
    }

    #[test]
    fn stopped_transport_renders_silence() {
        let c = controller_with_pads();
        c.set_step(0, 0, true).unwrap();
        let frames = c.render(512).unwrap();
        assert!(frames.iter().all(|f| *f == Frame::silence()));
    }

    #[test]
    fn live_pad_follows_loop_state() {
        let c = controller_with_pads();
        assert_eq!(c.toggle_loop(2).unwrap(), LoopState::Looping);
        c.trigger_pad(2, 127).unwrap();
        // A looped voice outlives its 400-frame buffer.
        c.render(2_000).unwrap();
        assert_eq!(c.stats().active_voices, 1);

        assert_eq!(c.pause_loop(2).unwrap(), LoopState::Paused);
        c.render(128).unwrap();
        assert_eq!(c.stats().active_voices, 0);

        c.trigger_pad(2, 127).unwrap();
        c.render(128).unwrap();
        assert_eq!(c.stats().active_voices, 0);

        assert_eq!(c.pause_loop(2).unwrap(), LoopState::Looping);
        c.render(128).unwrap();
        assert_eq!(c.stats().active_voices, 1);

        assert_eq!(c.toggle_loop(2).unwrap(), LoopState::Idle);
        c.render(128).unwrap();
        assert_eq!(c.stats().active_voices, 0);
    }

    #[test]
    fn looping_pad_presses_restart_one_voice() {
        let c = controller_with_pads();
        c.toggle_loop(6).unwrap();
        for _ in 0..3 {
            c.trigger_pad(6, 127).unwrap();
        }
        let frames = c.render(2_000).unwrap();
        assert_eq!(c.stats().active_voices, 1);
        assert_eq!(frames[1_999].left, 10_000);
    }

    #[test]
    fn idle_pad_is_one_shot() {
        let c = controller_with_pads();
        c.trigger_pad(4, 100).unwrap();
        c.render(128).unwrap();
        assert_eq!(c.stats().active_voices, 1);
        c.render(512).unwrap();
        assert_eq!(c.stats().active_voices, 0);
        c.trigger_pad(4, 100).unwrap();
        c.trigger_pad(5, 100).unwrap();
        c.render(128).unwrap();
        assert_eq!(c.stats().active_voices, 2);
        c.stop_pad(4).unwrap();
        c.render(128).unwrap();
        assert_eq!(c.stats().active_voices, 1);
    }

    #[test]
    fn bad_indices_are_rejected() {
        let c = Controller::new();
        assert!(matches!(
            c.trigger_pad(NUM_PADS as u8, 100),
            Err(ControllerError::Engine(EngineError::InvalidPad(16)))
        ));
        assert!(c.select_pattern(NUM_PATTERNS).is_err());
        assert!(c.toggle_loop(99).is_err());
        assert!(c.set_step(16, 0, true).is_err());
    }

    #[test]
    fn setters_clamp_and_mirror() {
        let c = Controller::new();
        c.set_cutoff(50_000.0).unwrap();
        c.set_bit_depth(1).unwrap();
        c.set_master_volume(200).unwrap();
        c.set_live_volume(150).unwrap();
        assert_eq!(c.effects().cutoff, 16_000.0);
        assert_eq!(c.effects().bit_depth, 4);
        assert_eq!(c.master_volume(), 100);
        assert_eq!(c.live_volume(), 100);
        c.set_tempo(500.0);
        assert_eq!(c.tempo(), 300.0);
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let c = Controller::new();
        for _ in 0..COMMAND_QUEUE_LEN {
            c.stop_all().unwrap();
        }
        assert!(matches!(c.stop_all(), Err(ControllerError::QueueFull)));
        assert_eq!(c.stats().dropped_commands, 1);
        c.render(128).unwrap();
        assert!(c.stop_all().is_ok());
    }

    #[test]
    fn pad_names_track_loads() {
        let c = Controller::new();
        c.load_pad(3, SampleBuffer::new("snare", vec![0; 4])).unwrap();
        assert_eq!(c.pad_name(3).unwrap().as_str(), "snare");
        c.unload_pad(3).unwrap();
        assert!(c.pad_name(3).is_none());
        assert!(c.pad_name(200).is_none());
    }

    #[test]
    fn threads_start_and_shut_down() {
        let c = controller_with_pads();
        c.set_step(0, 0, true).unwrap();
        c.play();
        c.start_with(|rate| Ok(NullOutput::new(rate))).unwrap();
        assert!(c.is_running());
        assert!(matches!(
            c.start_with(|rate| Ok(NullOutput::new(rate))),
            Err(ControllerError::Running)
        ));
        assert!(matches!(c.render(10), Err(ControllerError::Running)));
        std::thread::sleep(Duration::from_millis(50));
        c.shutdown().unwrap();
        assert!(!c.is_running());
        assert!(c.stats().load_percent >= 0.0);
        // The engine is back for offline use.
        assert!(c.render(10).is_ok());
    }

    #[test]
    fn failed_output_leaves_controller_usable() {
        let c = Controller::new();
        let result = c.start_with(|_| Err::<NullOutput, _>(AudioError::NoDevice));
        assert!(matches!(
            result,
            Err(ControllerError::Audio(AudioError::NoDevice))
        ));
        assert!(!c.is_running());
        assert!(c.render(10).is_ok());
    }
}
