//! Per-track live-loop and mute state.
//!
//! Advisory only: nothing here touches audio. The pad-trigger path reads
//! it to decide between a one-shot and a sustained loop, and the sequencer
//! reads the mute flag before dispatching a trigger.

use pb_ir::NUM_TRACKS;

use crate::error::EngineError;

/// Live-loop mode of one track.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopState {
    #[default]
    Idle,
    Looping,
    Paused,
}

impl LoopState {
    /// Idle starts a loop; a running or paused loop goes back to idle.
    pub fn toggled(self) -> Self {
        match self {
            LoopState::Idle => LoopState::Looping,
            LoopState::Looping | LoopState::Paused => LoopState::Idle,
        }
    }

    /// Looping pauses, paused resumes, idle stays idle.
    pub fn paused(self) -> Self {
        match self {
            LoopState::Idle => LoopState::Idle,
            LoopState::Looping => LoopState::Paused,
            LoopState::Paused => LoopState::Looping,
        }
    }

    /// A loop is engaged (running or paused).
    pub fn is_active(self) -> bool {
        self != LoopState::Idle
    }
}

/// Runtime flags of one track.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackState {
    /// Suppresses sequencer triggers. Pattern data and live pads are unaffected.
    pub muted: bool,
    pub loop_state: LoopState,
}

/// Track flags for every track.
#[derive(Clone, Debug, Default)]
pub struct LiveLoops {
    tracks: [TrackState; NUM_TRACKS],
}

impl LiveLoops {
    pub fn new() -> Self {
        Self::default()
    }

    fn track_mut(&mut self, track: usize) -> Result<&mut TrackState, EngineError> {
        self.tracks
            .get_mut(track)
            .ok_or(EngineError::InvalidTrack(track))
    }

    /// Flags of one track.
    pub fn get(&self, track: usize) -> Option<TrackState> {
        self.tracks.get(track).copied()
    }

    pub fn set_muted(&mut self, track: usize, muted: bool) -> Result<(), EngineError> {
        self.track_mut(track)?.muted = muted;
        Ok(())
    }

    /// False for out-of-range tracks.
    pub fn is_muted(&self, track: usize) -> bool {
        self.get(track).is_some_and(|t| t.muted)
    }

    /// Toggle the loop, returning the new state.
    pub fn toggle_loop(&mut self, track: usize) -> Result<LoopState, EngineError> {
        let t = self.track_mut(track)?;
        t.loop_state = t.loop_state.toggled();
        Ok(t.loop_state)
    }

    /// Pause or resume the loop, returning the new state.
    pub fn pause_loop(&mut self, track: usize) -> Result<LoopState, EngineError> {
        let t = self.track_mut(track)?;
        t.loop_state = t.loop_state.paused();
        Ok(t.loop_state)
    }

    pub fn loop_state(&self, track: usize) -> LoopState {
        self.get(track).map_or(LoopState::Idle, |t| t.loop_state)
    }

    /// True while a loop is engaged, paused or not.
    pub fn is_looping(&self, track: usize) -> bool {
        self.loop_state(track).is_active()
    }

    pub fn is_loop_paused(&self, track: usize) -> bool {
        self.loop_state(track) == LoopState::Paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_cycles_idle_and_looping() {
        let mut loops = LiveLoops::new();
        assert_eq!(loops.toggle_loop(2), Ok(LoopState::Looping));
        assert!(loops.is_looping(2));
        assert_eq!(loops.toggle_loop(2), Ok(LoopState::Idle));
        assert!(!loops.is_looping(2));
    }

    #[test]
    fn pause_resumes_and_is_noop_when_idle() {
        let mut loops = LiveLoops::new();
        assert_eq!(loops.pause_loop(0), Ok(LoopState::Idle));
        loops.toggle_loop(0).unwrap();
        assert_eq!(loops.pause_loop(0), Ok(LoopState::Paused));
        assert!(loops.is_looping(0));
        assert!(loops.is_loop_paused(0));
        assert_eq!(loops.pause_loop(0), Ok(LoopState::Looping));
    }

    #[test]
    fn toggle_from_paused_goes_idle() {
        let mut loops = LiveLoops::new();
        loops.toggle_loop(5).unwrap();
        loops.pause_loop(5).unwrap();
        assert_eq!(loops.toggle_loop(5), Ok(LoopState::Idle));
        assert!(!loops.is_loop_paused(5));
    }

    #[test]
    fn mute_is_independent_of_loop() {
        let mut loops = LiveLoops::new();
        loops.toggle_loop(1).unwrap();
        loops.set_muted(1, true).unwrap();
        assert!(loops.is_muted(1));
        assert_eq!(loops.loop_state(1), LoopState::Looping);
        loops.set_muted(1, false).unwrap();
        assert!(loops.is_looping(1));
    }

    #[test]
    fn bad_track_is_rejected() {
        let mut loops = LiveLoops::new();
        assert_eq!(
            loops.toggle_loop(NUM_TRACKS),
            Err(EngineError::InvalidTrack(NUM_TRACKS))
        );
        assert!(loops.set_muted(100, true).is_err());
        assert!(loops.pause_loop(usize::MAX).is_err());
        assert!(!loops.is_muted(100));
        assert!(!loops.is_looping(100));
    }
}
