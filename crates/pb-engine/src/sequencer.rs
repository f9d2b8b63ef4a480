//! Step sequencer and timing engine.
//!
//! The sequencer is driven by elapsed wall time: the control loop calls
//! [`Sequencer::advance`] with however long it has been since the last call
//! and the sequencer fires every step boundary crossed in that window.
//! Callbacks run synchronously on the caller's thread and must not block
//! or call back into the sequencer.

use alloc::boxed::Box;
use core::time::Duration;

use pb_ir::{
    clamp_tempo, Cell, Pattern, MAX_VELOCITY, NUM_PATTERNS, STEPS_PER_BEAT, STEPS_PER_PATTERN,
};

use crate::error::EngineError;
use crate::live_loop::{LiveLoops, LoopState};

/// Called with `(track, velocity)` for every unmuted active cell on a step.
pub type TriggerCallback = Box<dyn FnMut(u8, u8) + Send>;
/// Called with the new step index after each step's triggers.
pub type StepCallback = Box<dyn FnMut(u8) + Send>;

/// Tempo at power-up.
pub const DEFAULT_TEMPO: f32 = 120.0;

/// Transport state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Transport {
    #[default]
    Stopped,
    Playing,
}

/// Pattern store plus playback cursor.
pub struct Sequencer {
    patterns: [Pattern; NUM_PATTERNS],
    tracks: LiveLoops,
    current_pattern: usize,
    queued_pattern: Option<usize>,
    current_step: usize,
    transport: Transport,
    tempo: f32,
    interval_us: u64,
    elapsed_us: u64,
    downbeat_pending: bool,
    bars: u32,
    on_trigger: Option<TriggerCallback>,
    on_step: Option<StepCallback>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            patterns: [Pattern::new(); NUM_PATTERNS],
            tracks: LiveLoops::new(),
            current_pattern: 0,
            queued_pattern: None,
            current_step: 0,
            transport: Transport::Stopped,
            tempo: DEFAULT_TEMPO,
            interval_us: step_interval_us(DEFAULT_TEMPO),
            elapsed_us: 0,
            downbeat_pending: false,
            bars: 0,
            on_trigger: None,
            on_step: None,
        }
    }

    /// Install the trigger callback.
    pub fn set_trigger_callback(&mut self, callback: TriggerCallback) {
        self.on_trigger = Some(callback);
    }

    /// Install the step-change callback.
    pub fn set_step_callback(&mut self, callback: StepCallback) {
        self.on_step = Some(callback);
    }

    // --- Transport ---

    /// Start from step 0. The downbeat fires on the next `advance`.
    /// No-op while already playing.
    pub fn start(&mut self) {
        if self.transport == Transport::Playing {
            return;
        }
        self.transport = Transport::Playing;
        self.current_step = 0;
        self.elapsed_us = 0;
        self.bars = 0;
        self.queued_pattern = None;
        self.downbeat_pending = true;
    }

    /// Stop. The cursor stays where it is. No-op while stopped.
    pub fn stop(&mut self) {
        self.transport = Transport::Stopped;
        self.downbeat_pending = false;
    }

    pub fn is_playing(&self) -> bool {
        self.transport == Transport::Playing
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Tempo in BPM.
    pub fn tempo(&self) -> f32 {
        self.tempo
    }

    /// Set the tempo, clamped to 30-300 BPM. Time already accumulated
    /// towards the next step is kept.
    pub fn set_tempo(&mut self, bpm: f32) {
        self.tempo = clamp_tempo(bpm);
        self.interval_us = step_interval_us(self.tempo);
    }

    /// Duration of one step at the current tempo.
    pub fn step_interval(&self) -> Duration {
        Duration::from_micros(self.interval_us)
    }

    pub fn current_step(&self) -> u8 {
        self.current_step as u8
    }

    pub fn current_pattern(&self) -> u8 {
        self.current_pattern as u8
    }

    /// Completed passes through the last step since `start`.
    pub fn bars_played(&self) -> u32 {
        self.bars
    }

    /// Run the clock forward by `elapsed`, firing callbacks for every step
    /// reached. Returns how many times the cursor moved.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        if self.transport != Transport::Playing {
            return 0;
        }
        if self.downbeat_pending {
            self.downbeat_pending = false;
            self.fire_step();
        }

        self.elapsed_us = self
            .elapsed_us
            .saturating_add(elapsed.as_micros().min(u64::MAX as u128) as u64);
        let mut moved = 0;
        while self.elapsed_us >= self.interval_us {
            self.elapsed_us -= self.interval_us;
            self.current_step = (self.current_step + 1) % STEPS_PER_PATTERN;
            if self.current_step == 0 {
                self.bars = self.bars.wrapping_add(1);
                if let Some(next) = self.queued_pattern.take() {
                    self.current_pattern = next;
                }
            }
            self.fire_step();
            moved += 1;
        }
        moved
    }

    fn fire_step(&mut self) {
        let step = self.current_step;
        let pattern = &self.patterns[self.current_pattern];
        if let Some(callback) = self.on_trigger.as_mut() {
            for (track, row) in pattern.cells.iter().enumerate() {
                let cell = row[step];
                if cell.active && !self.tracks.is_muted(track) {
                    callback(track as u8, cell.velocity);
                }
            }
        }
        if let Some(callback) = self.on_step.as_mut() {
            callback(step as u8);
        }
    }

    // --- Patterns ---

    /// Switch the pattern played from the next step on. The cursor and
    /// transport are untouched.
    pub fn select_pattern(&mut self, index: usize) -> Result<(), EngineError> {
        if index >= NUM_PATTERNS {
            return Err(EngineError::InvalidPattern(index));
        }
        self.current_pattern = index;
        Ok(())
    }

    /// Switch to `index` when the current bar ends, before its downbeat
    /// fires. Replaces any earlier queued switch.
    pub fn queue_pattern(&mut self, index: usize) -> Result<(), EngineError> {
        if index >= NUM_PATTERNS {
            return Err(EngineError::InvalidPattern(index));
        }
        self.queued_pattern = Some(index);
        Ok(())
    }

    pub fn queued_pattern(&self) -> Option<u8> {
        self.queued_pattern.map(|p| p as u8)
    }

    pub fn pattern(&self, index: usize) -> Option<&Pattern> {
        self.patterns.get(index)
    }

    /// Replace a whole pattern slot.
    pub fn load_pattern(&mut self, index: usize, pattern: Pattern) -> Result<(), EngineError> {
        let slot = self
            .patterns
            .get_mut(index)
            .ok_or(EngineError::InvalidPattern(index))?;
        *slot = pattern;
        Ok(())
    }

    pub fn clear_pattern(&mut self, index: usize) -> Result<(), EngineError> {
        self.load_pattern(index, Pattern::new())
    }

    fn cell_mut(&mut self, track: usize, step: usize) -> Result<&mut Cell, EngineError> {
        self.patterns[self.current_pattern]
            .cell_mut(track, step)
            .ok_or(EngineError::InvalidTrack(track))
    }

    /// Set a cell of the current pattern. The step wraps modulo the pattern length.
    pub fn set_step(&mut self, track: usize, step: usize, active: bool) -> Result<(), EngineError> {
        self.cell_mut(track, step)?.active = active;
        Ok(())
    }

    /// False for out-of-range tracks.
    pub fn step(&self, track: usize, step: usize) -> bool {
        self.patterns[self.current_pattern]
            .cell(track, step)
            .is_some_and(|c| c.active)
    }

    /// Set a cell's velocity, clamped to 0-127.
    pub fn set_step_velocity(
        &mut self,
        track: usize,
        step: usize,
        velocity: u8,
    ) -> Result<(), EngineError> {
        self.cell_mut(track, step)?.velocity = velocity.min(MAX_VELOCITY);
        Ok(())
    }

    /// Velocity of a cell; full velocity for out-of-range tracks.
    pub fn step_velocity(&self, track: usize, step: usize) -> u8 {
        self.patterns[self.current_pattern]
            .cell(track, step)
            .map_or(MAX_VELOCITY, |c| c.velocity)
    }

    // --- Track state ---

    pub fn mute_track(&mut self, track: usize, muted: bool) -> Result<(), EngineError> {
        self.tracks.set_muted(track, muted)
    }

    pub fn is_muted(&self, track: usize) -> bool {
        self.tracks.is_muted(track)
    }

    pub fn toggle_loop(&mut self, track: usize) -> Result<LoopState, EngineError> {
        self.tracks.toggle_loop(track)
    }

    pub fn pause_loop(&mut self, track: usize) -> Result<LoopState, EngineError> {
        self.tracks.pause_loop(track)
    }

    pub fn loop_state(&self, track: usize) -> LoopState {
        self.tracks.loop_state(track)
    }

    pub fn is_looping(&self, track: usize) -> bool {
        self.tracks.is_looping(track)
    }

    pub fn is_loop_paused(&self, track: usize) -> bool {
        self.tracks.is_loop_paused(track)
    }

    /// Track flags, for display.
    pub fn tracks(&self) -> &LiveLoops {
        &self.tracks
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

/// `60 s / bpm / steps-per-beat`, in microseconds.
fn step_interval_us(bpm: f32) -> u64 {
    (60_000_000.0 / (bpm as f64 * STEPS_PER_BEAT as f64)) as u64
}
