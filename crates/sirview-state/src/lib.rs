//! Viewer state: what is on screen and the two sources that change it.
//!
//! - [`PlaybackController`] replays a precomputed batch run on a local clock.
//! - [`StreamConsumer`] applies live stream messages as they arrive.
//!
//! Both implement [`DataSource`] and write through the same [`FrameSink`]
//! contract into a [`ViewState`], which the renderers read.

pub mod generation;
pub mod history;
pub mod live;
pub mod playback;
pub mod scheduler;
pub mod source;
pub mod view;

pub use generation::{Generation, GenerationCounter, Tagged};
pub use history::HistoryBuffer;
pub use live::{LivePhase, StreamConsumer};
pub use playback::{PlaybackController, PlaybackError, PlaybackPhase, PlaybackState};
pub use scheduler::{IntervalScheduler, TaskGuard, TickScheduler};
pub use source::{DataSource, EventReceiver, EventSender, RunMode, SourceEvent, SourceOutcome};
pub use view::{FrameSink, ViewState};
