use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;

use crate::{EventSender, Generation, SourceEvent, Tagged};

/// Aborts the wrapped task when dropped.
#[derive(Debug)]
pub struct TaskGuard(AbortHandle);

impl TaskGuard {
    pub fn new(handle: AbortHandle) -> Self {
        Self(handle)
    }

    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// The playback clock. At most one clock runs per scheduler; starting again
/// replaces the previous one.
pub trait TickScheduler: Send {
    fn start(&mut self, generation: Generation);
    fn stop(&mut self);
    fn is_running(&self) -> bool;

    /// The consumer took the last tick; the clock may queue another.
    fn acknowledge(&self) {}
}

/// Fixed-period clock that sends [`SourceEvent::Tick`] tagged with the
/// generation it was started for.
///
/// At most one tick is in the channel at a time: until the consumer calls
/// [`TickScheduler::acknowledge`], further periods are skipped. A consumer
/// that stalls resumes at one frame per period instead of catching up.
pub struct IntervalScheduler {
    period: Duration,
    events: EventSender,
    task: Option<TaskGuard>,
    pending: Arc<AtomicBool>,
}

impl IntervalScheduler {
    pub fn new(period: Duration, events: EventSender) -> Self {
        Self {
            period,
            events,
            task: None,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl TickScheduler for IntervalScheduler {
    fn start(&mut self, generation: Generation) {
        self.stop();
        let period = self.period;
        let events = self.events.clone();
        // Each clock gets its own flag so a stale tick cannot unblock it.
        let pending = Arc::new(AtomicBool::new(false));
        self.pending = Arc::clone(&pending);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if pending.swap(true, Ordering::AcqRel) {
                    continue;
                }
                if events.send(Tagged::new(generation, SourceEvent::Tick)).is_err() {
                    break;
                }
            }
        });
        self.task = Some(TaskGuard::new(task.abort_handle()));
        tracing::debug!(%generation, period_ms = period.as_millis() as u64, "Playback clock started");
    }

    fn stop(&mut self) {
        if self.task.take().is_some() {
            tracing::debug!("Playback clock stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn acknowledge(&self) {
        self.pending.store(false, Ordering::Release);
    }
}
