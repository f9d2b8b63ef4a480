//! Scheduling for the audio render thread.

use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Priority used when `PADBOX_THREAD_PRIORITY` is unset or invalid.
const DEFAULT_AUDIO_THREAD_PRIORITY: u8 = 70;

/// Reads `PADBOX_THREAD_PRIORITY` (0-99). Call before spawning the audio
/// thread so the environment is never touched from it.
pub fn audio_thread_priority() -> ThreadPriority {
    std::env::var("PADBOX_THREAD_PRIORITY")
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .filter(|&n| n < 100)
        .or(Some(DEFAULT_AUDIO_THREAD_PRIORITY))
        .and_then(|n| ThreadPriorityValue::try_from(n).ok())
        .map_or(ThreadPriority::Max, ThreadPriority::Crossplatform)
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| {
        v == "1"
            || v.eq_ignore_ascii_case("true")
            || v.eq_ignore_ascii_case("yes")
            || v.eq_ignore_ascii_case("on")
    })
}

/// Whether to try SCHED_FIFO. Opt out with `PADBOX_DISABLE_RT_AUDIO=1`.
pub fn rt_audio_enabled() -> bool {
    !env_flag("PADBOX_DISABLE_RT_AUDIO")
}

/// What the audio thread got from the scheduler. Built on the audio thread
/// and logged by whoever started it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulingReport {
    /// Error from raising the priority, if it failed.
    pub priority_error: Option<String>,
    /// Outcome of the SCHED_FIFO request; `None` when not attempted.
    pub fifo: Option<Result<(), String>>,
}

impl SchedulingReport {
    pub fn log(&self) {
        if let Some(e) = &self.priority_error {
            warn!(error = %e, "Could not raise audio thread priority");
        }
        match &self.fifo {
            Some(Ok(())) => info!("Enabled SCHED_FIFO for audio thread"),
            Some(Err(e)) => warn!(error = %e, "Failed to set SCHED_FIFO for audio thread"),
            None => {}
        }
    }
}

/// Raise the calling thread. Failures are reported, not fatal: an
/// unprivileged user still gets a working, if less robust, engine.
pub fn configure_audio_thread(priority: ThreadPriority, rt_audio: bool) -> SchedulingReport {
    let mut report = SchedulingReport {
        priority_error: set_current_thread_priority(priority)
            .err()
            .map(|e| format!("{e:?}")),
        fifo: None,
    };

    #[cfg(unix)]
    if rt_audio {
        use thread_priority::unix::{
            set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
            ThreadSchedulePolicy,
        };
        report.fifo = Some(
            set_thread_priority_and_policy(
                thread_native_id(),
                priority,
                ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
            )
            .map_err(|e| format!("{e:?}")),
        );
    }
    #[cfg(not(unix))]
    let _ = rt_audio;

    report
}
