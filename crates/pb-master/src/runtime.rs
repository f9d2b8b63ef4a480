//! Audio and control thread bodies.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use pb_audio::{AudioError, AudioOutput};
use pb_engine::{CaptureRing, Engine, Frame, Sequencer};
use pb_ir::{Command, SampleBuffer, MAX_BLOCK_FRAMES};
use thread_priority::ThreadPriority;
use tracing::{error, info};

use crate::load_meter::LoadMeter;
use crate::presets::{PatternCycle, PRESETS};
use crate::thread_priority::{configure_audio_thread, SchedulingReport};

/// Sequencer clock resolution.
pub const CONTROL_TICK: Duration = Duration::from_millis(5);
/// Period of the status log line.
pub const STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// State both threads and the controller read.
pub(crate) struct Shared {
    pub running: AtomicBool,
    pub audio_failed: AtomicBool,
    pub step: AtomicU8,
    pub active_voices: AtomicUsize,
    pub voice_steals: AtomicU64,
    pub rejected_commands: AtomicU64,
    pub dropped_commands: AtomicU64,
    pub lost_buffers: AtomicU64,
    pub load: LoadMeter,
    pub capture: Arc<CaptureRing>,
}

impl Shared {
    pub fn new(load: LoadMeter) -> Self {
        Self {
            running: AtomicBool::new(false),
            audio_failed: AtomicBool::new(false),
            step: AtomicU8::new(0),
            active_voices: AtomicUsize::new(0),
            voice_steals: AtomicU64::new(0),
            rejected_commands: AtomicU64::new(0),
            dropped_commands: AtomicU64::new(0),
            lost_buffers: AtomicU64::new(0),
            load,
            capture: Arc::new(CaptureRing::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Apply every queued command to `engine`. Buffers leaving the engine,
    /// displaced or rejected, go to `retired`; they are only dropped here if
    /// that queue is full.
    pub fn drain_commands(
        &self,
        engine: &mut Engine,
        commands: &Receiver<Command>,
        retired: &Sender<SampleBuffer>,
    ) {
        for command in commands.try_iter() {
            let applied = engine.apply_retiring(command, |buffer| {
                if retired.try_send(buffer).is_err() {
                    self.lost_buffers.fetch_add(1, Ordering::Relaxed);
                }
            });
            if applied.is_err() {
                self.rejected_commands.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn publish(&self, engine: &Engine) {
        let voices = engine.voices();
        self.active_voices
            .store(voices.active_count(), Ordering::Relaxed);
        self.voice_steals
            .store(voices.steal_count(), Ordering::Relaxed);
    }
}

/// Everything the audio thread owns.
pub(crate) struct AudioJob {
    pub engine: Engine,
    pub commands: Receiver<Command>,
    pub retired: Sender<SampleBuffer>,
    pub shared: Arc<Shared>,
    pub block_frames: usize,
    pub priority: ThreadPriority,
    pub rt_audio: bool,
}

/// Body of the audio thread. Opens the output through `factory` (on this
/// thread, since device streams may not be `Send`), reports the outcome and
/// the scheduling it got on `ready`, then renders until `running` clears.
/// Hands the engine back.
pub(crate) fn audio_thread<O, F>(
    job: AudioJob,
    factory: F,
    ready: Sender<Result<SchedulingReport, AudioError>>,
) -> Engine
where
    O: AudioOutput,
    F: FnOnce(u32) -> Result<O, AudioError>,
{
    let AudioJob {
        mut engine,
        commands,
        retired,
        shared,
        block_frames,
        priority,
        rt_audio,
    } = job;

    let mut output = match factory(pb_ir::NATIVE_SAMPLE_RATE).and_then(|mut output| {
        output.start()?;
        Ok(output)
    }) {
        Ok(output) => output,
        Err(e) => {
            let _ = ready.send(Err(e));
            return engine;
        }
    };
    let report = configure_audio_thread(priority, rt_audio);
    let _ = ready.send(Ok(report));

    let mut block = [Frame::silence(); MAX_BLOCK_FRAMES];
    let block = &mut block[..block_frames.min(MAX_BLOCK_FRAMES)];

    while shared.is_running() {
        let started = Instant::now();
        shared.drain_commands(&mut engine, &commands, &retired);
        engine.render_block(block);
        shared.load.record(started.elapsed());
        shared.publish(&engine);

        if let Err(e) = output.write(block) {
            if !matches!(e, AudioError::NotRunning) {
                shared.audio_failed.store(true, Ordering::Release);
            }
            break;
        }
    }

    let _ = output.stop();
    engine
}

/// Everything the control thread owns.
pub(crate) struct ControlJob {
    pub sequencer: Arc<Mutex<Sequencer>>,
    pub cycle: Arc<Mutex<PatternCycle>>,
    pub retired: Receiver<SampleBuffer>,
    pub shared: Arc<Shared>,
}

/// Body of the control thread: sequencer clock, buffer reclamation,
/// pattern cycling and the periodic status line.
pub(crate) fn control_thread(job: ControlJob) {
    let ControlJob {
        sequencer,
        cycle,
        retired,
        shared,
    } = job;

    let mut last_tick = Instant::now();
    let mut last_status = last_tick;
    let mut failure_reported = false;

    while shared.is_running() {
        std::thread::sleep(CONTROL_TICK);
        let now = Instant::now();

        {
            let mut seq = sequencer.lock();
            seq.advance(now.duration_since(last_tick));
            if let Some(next) = cycle.lock().poll(&mut seq) {
                info!(
                    pattern = next,
                    name = PRESETS.get(next).map_or("", |p| p.name),
                    "Queued next pattern"
                );
            }
        }
        last_tick = now;

        retired.try_iter().for_each(drop);

        if !failure_reported && shared.audio_failed.load(Ordering::Acquire) {
            error!("Audio output failed; rendering has stopped");
            failure_reported = true;
        }

        if now.duration_since(last_status) >= STATUS_INTERVAL {
            let (pattern, tempo, playing) = {
                let seq = sequencer.lock();
                (seq.current_pattern(), seq.tempo(), seq.is_playing())
            };
            info!(
                playing,
                pattern,
                step = shared.step.load(Ordering::Relaxed),
                tempo,
                voices = shared.active_voices.load(Ordering::Relaxed),
                steals = shared.voice_steals.load(Ordering::Relaxed),
                dropped = shared.dropped_commands.load(Ordering::Relaxed),
                rejected = shared.rejected_commands.load(Ordering::Relaxed),
                load = format!("{:.1}%", shared.load.percent()),
                "Status"
            );
            last_status = now;
        }
    }

    retired.try_iter().for_each(drop);
}
