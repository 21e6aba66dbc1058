use sirview_network::{StreamEvent, Subscription};
use sirview_protocol::LIVE_HISTORY_CAPACITY;

use crate::{DataSource, FrameSink, Generation, RunMode, SourceEvent, SourceOutcome, Tagged};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivePhase {
    Idle,
    Connecting,
    Streaming,
}

impl LivePhase {
    pub fn name(self) -> &'static str {
        match self {
            LivePhase::Idle => "idle",
            LivePhase::Connecting => "connecting",
            LivePhase::Streaming => "streaming",
        }
    }
}

/// Applies pushed stream messages to the view as they arrive, keeping a
/// rolling window of recent samples.
///
/// Messages are applied in arrival order. No reordering or de-duplication
/// is attempted.
#[derive(Debug)]
pub struct StreamConsumer {
    generation: Generation,
    phase: LivePhase,
    subscription: Option<Subscription>,
    capacity: usize,
    received: u64,
    dropped: u64,
}

impl Default for StreamConsumer {
    fn default() -> Self {
        Self::new(LIVE_HISTORY_CAPACITY)
    }
}

impl StreamConsumer {
    pub fn new(capacity: usize) -> Self {
        Self {
            generation: Generation::default(),
            phase: LivePhase::Idle,
            subscription: None,
            capacity,
            received: 0,
            dropped: 0,
        }
    }

    pub fn phase(&self) -> LivePhase {
        self.phase
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Messages applied since the current run began.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Messages skipped since the current run began.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Start serving a new live run. Any previous subscription is closed
    /// first.
    pub fn begin(&mut self, generation: Generation, subscription: Option<Subscription>) {
        self.close_subscription();
        self.generation = generation;
        self.subscription = subscription;
        self.phase = LivePhase::Connecting;
        self.received = 0;
        self.dropped = 0;
        tracing::debug!(%generation, "Live run connecting");
    }

    fn close_subscription(&mut self) {
        if let Some(mut sub) = self.subscription.take() {
            sub.close();
        }
    }

    fn on_stream(&mut self, event: StreamEvent, sink: &mut dyn FrameSink) -> SourceOutcome {
        match event {
            StreamEvent::Opened => {
                sink.reset_history(self.capacity);
                self.phase = LivePhase::Streaming;
                tracing::info!(generation = %self.generation, "Live stream opened");
                SourceOutcome::Started { frames: None }
            }
            StreamEvent::Message(message) => {
                self.phase = LivePhase::Streaming;
                sink.set_current_frame(message.frame);
                sink.append_sample(message.stats);
                self.received += 1;
                SourceOutcome::Applied
            }
            StreamEvent::Rejected(e) => {
                self.dropped += 1;
                tracing::warn!(generation = %self.generation, error = %e, "Dropped live message");
                SourceOutcome::Dropped(e)
            }
            StreamEvent::Failed(e) => {
                tracing::warn!(generation = %self.generation, error = %e, "Live stream failed");
                self.close_subscription();
                self.phase = LivePhase::Idle;
                SourceOutcome::Failed(e)
            }
            StreamEvent::Ended => {
                tracing::info!(
                    generation = %self.generation,
                    received = self.received,
                    dropped = self.dropped,
                    "Live stream ended"
                );
                self.close_subscription();
                self.phase = LivePhase::Idle;
                SourceOutcome::Finished
            }
        }
    }
}

impl DataSource for StreamConsumer {
    fn mode(&self) -> RunMode {
        RunMode::Live
    }

    fn generation(&self) -> Generation {
        self.generation
    }

    fn phase_name(&self) -> &'static str {
        self.phase.name()
    }

    fn is_active(&self) -> bool {
        self.phase != LivePhase::Idle
    }

    fn handle(&mut self, event: Tagged<SourceEvent>, sink: &mut dyn FrameSink) -> SourceOutcome {
        if event.generation != self.generation || self.phase == LivePhase::Idle {
            return SourceOutcome::Ignored;
        }
        match event.event {
            SourceEvent::Stream(stream_event) => self.on_stream(stream_event, sink),
            SourceEvent::Tick | SourceEvent::BatchLoaded(_) => SourceOutcome::Ignored,
        }
    }

    /// Close the connection and leave the last frame and history on screen.
    fn stop(&mut self) {
        self.close_subscription();
        if self.phase != LivePhase::Idle {
            tracing::debug!(generation = %self.generation, "Live run stopped");
            self.phase = LivePhase::Idle;
        }
    }
}
