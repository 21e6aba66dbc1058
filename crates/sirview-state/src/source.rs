use tokio::sync::mpsc;

use sirview_network::{ClientError, StreamEvent};
use sirview_protocol::RunResult;

use crate::{FrameSink, Generation, PlaybackError, Tagged};

/// Which kind of run a source drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Batch,
    Live,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Batch => write!(f, "batch"),
            RunMode::Live => write!(f, "live"),
        }
    }
}

/// Everything that can happen to a run off the UI thread. Producers (the
/// batch request task, the stream reader, the playback clock) send these
/// into one channel; the owner of the [`crate::ViewState`] drains it.
#[derive(Debug)]
pub enum SourceEvent {
    Tick,
    BatchLoaded(Result<RunResult, ClientError>),
    Stream(StreamEvent),
}

pub type EventSender = mpsc::UnboundedSender<Tagged<SourceEvent>>;
pub type EventReceiver = mpsc::UnboundedReceiver<Tagged<SourceEvent>>;

/// What handling one event did, for the caller to report.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    /// Stale, out of phase, or not meant for this source.
    Ignored,
    /// A new frame and sample reached the sink.
    Applied,
    /// The run is ready: batch frames loaded or the stream opened.
    Started { frames: Option<usize> },
    /// Playback reached the last frame, or the stream ended cleanly.
    Finished,
    /// One live message was skipped; the run continues.
    Dropped(ClientError),
    /// The run failed and the source is back to idle.
    Failed(ClientError),
}

/// One way of feeding frames and samples into a [`FrameSink`].
pub trait DataSource: Send {
    fn mode(&self) -> RunMode;

    /// Generation of the run this source is currently serving.
    fn generation(&self) -> Generation;

    /// Short lowercase name of the current phase, for status lines.
    fn phase_name(&self) -> &'static str;

    /// True while the source is loading, playing or connected.
    fn is_active(&self) -> bool;

    fn handle(&mut self, event: Tagged<SourceEvent>, sink: &mut dyn FrameSink) -> SourceOutcome;

    /// Release timers, requests and connections. Idempotent.
    fn stop(&mut self);

    /// `(current_index, frame_count)` for sources that have a fixed length.
    fn progress(&self) -> Option<(usize, usize)> {
        None
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        Err(PlaybackError::Unsupported(self.mode()))
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        Err(PlaybackError::Unsupported(self.mode()))
    }

    fn reset(&mut self, _sink: &mut dyn FrameSink) -> Result<(), PlaybackError> {
        Err(PlaybackError::Unsupported(self.mode()))
    }
}
