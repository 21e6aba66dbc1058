//! Local replay of a precomputed batch run.
//!
//! The whole run arrives in one response; afterwards a fixed-period clock
//! advances an index over the frames. Phases:
//!
//! ```text
//! Idle/Playing/Paused --begin--> Loading --loaded--> Playing (Paused if one frame)
//!                                Loading --failed--> Idle
//! Playing --tick at last frame--> Paused
//! Playing --pause--> Paused --play--> Playing
//! any --reset--> Paused at frame 0
//! ```

use thiserror::Error;

use sirview_network::ClientError;
use sirview_protocol::{Frame, RunResult};

use crate::{
    DataSource, FrameSink, Generation, RunMode, SourceEvent, SourceOutcome, Tagged, TaskGuard,
    TickScheduler,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Loading,
    Playing,
    Paused,
}

impl PlaybackPhase {
    pub fn name(self) -> &'static str {
        match self {
            PlaybackPhase::Idle => "idle",
            PlaybackPhase::Loading => "loading",
            PlaybackPhase::Playing => "playing",
            PlaybackPhase::Paused => "paused",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("no frames loaded")]
    NoFrames,
    #[error("playback is not running")]
    NotPlaying,
    #[error("playback is not paused, reset to replay")]
    NotPaused,
    #[error("a run is still loading")]
    Loading,
    #[error("already at the last frame, reset to replay")]
    AtEnd,
    #[error("{0} mode has no playback controls")]
    Unsupported(RunMode),
}

/// Read-only view of the loaded run and the replay position.
#[derive(Debug, Default)]
pub struct PlaybackState {
    run: Option<RunResult>,
    current_index: usize,
}

impl PlaybackState {
    pub fn run(&self) -> Option<&RunResult> {
        self.run.as_ref()
    }

    pub fn frames(&self) -> &[Frame] {
        self.run.as_ref().map_or(&[], |r| r.frames.as_slice())
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.run.as_ref().and_then(|r| r.frame(self.current_index))
    }

    fn at_end(&self) -> bool {
        match self.run.as_ref().and_then(RunResult::last_index) {
            Some(last) => self.current_index >= last,
            None => true,
        }
    }
}

pub struct PlaybackController<S: TickScheduler> {
    generation: Generation,
    phase: PlaybackPhase,
    state: PlaybackState,
    scheduler: S,
    request: Option<TaskGuard>,
}

impl<S: TickScheduler> PlaybackController<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            generation: Generation::default(),
            phase: PlaybackPhase::Idle,
            state: PlaybackState::default(),
            scheduler,
            request: None,
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_playing(&self) -> bool {
        self.phase == PlaybackPhase::Playing
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Start loading a new run. Valid from any phase: the clock stops and
    /// any earlier in-flight request is dropped. `request` is the task
    /// fetching the run, aborted if this run is superseded first.
    pub fn begin(&mut self, generation: Generation, request: Option<TaskGuard>) {
        self.scheduler.stop();
        self.request = request;
        self.generation = generation;
        self.phase = PlaybackPhase::Loading;
        tracing::debug!(%generation, "Batch run loading");
    }

    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        if self.phase != PlaybackPhase::Playing {
            return Err(PlaybackError::NotPlaying);
        }
        self.scheduler.stop();
        self.phase = PlaybackPhase::Paused;
        Ok(())
    }

    /// Resume from `Paused`. An idle controller, including one whose last
    /// load failed, has to be reset first.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        match self.phase {
            PlaybackPhase::Playing => return Ok(()),
            PlaybackPhase::Loading => return Err(PlaybackError::Loading),
            PlaybackPhase::Idle if self.state.frames().is_empty() => {
                return Err(PlaybackError::NoFrames)
            }
            PlaybackPhase::Idle => return Err(PlaybackError::NotPaused),
            PlaybackPhase::Paused => {}
        }
        if self.state.frames().is_empty() {
            return Err(PlaybackError::NoFrames);
        }
        if self.state.at_end() {
            return Err(PlaybackError::AtEnd);
        }
        self.phase = PlaybackPhase::Playing;
        self.scheduler.start(self.generation);
        Ok(())
    }

    /// Rewind to frame 0 and pause. The chart restarts from the first
    /// sample. A pending load is cancelled.
    pub fn reset(&mut self, sink: &mut dyn FrameSink) {
        self.scheduler.stop();
        self.request = None;
        self.state.current_index = 0;
        self.phase = PlaybackPhase::Paused;
        if let Some(run) = self.state.run.as_ref() {
            sink.reset_history(run.len());
            apply_index(run, 0, sink);
        }
    }

    /// Advance one frame. Ticks while not playing are ignored, so a tick
    /// already in the channel when pause happened is harmless.
    pub fn tick(&mut self, sink: &mut dyn FrameSink) -> SourceOutcome {
        if self.phase != PlaybackPhase::Playing {
            return SourceOutcome::Ignored;
        }
        let Some(run) = self.state.run.as_ref() else {
            self.finish();
            return SourceOutcome::Finished;
        };
        let Some(last) = run.last_index() else {
            self.finish();
            return SourceOutcome::Finished;
        };
        if self.state.current_index >= last {
            self.finish();
            return SourceOutcome::Finished;
        }

        self.state.current_index += 1;
        apply_index(run, self.state.current_index, sink);

        if self.state.current_index == last {
            tracing::debug!(generation = %self.generation, frames = last + 1, "Playback finished");
            self.finish();
            return SourceOutcome::Finished;
        }
        SourceOutcome::Applied
    }

    fn finish(&mut self) {
        self.scheduler.stop();
        self.phase = PlaybackPhase::Paused;
    }

    fn on_loaded(
        &mut self,
        result: Result<RunResult, ClientError>,
        sink: &mut dyn FrameSink,
    ) -> SourceOutcome {
        if self.phase != PlaybackPhase::Loading {
            return SourceOutcome::Ignored;
        }
        self.request = None;
        let run = match result {
            Ok(run) => run,
            Err(e) => {
                tracing::warn!(generation = %self.generation, error = %e, "Batch run failed");
                self.phase = PlaybackPhase::Idle;
                return SourceOutcome::Failed(e);
            }
        };

        let frames = run.len();
        sink.reset_history(frames);
        apply_index(&run, 0, sink);
        self.state = PlaybackState {
            run: Some(run),
            current_index: 0,
        };

        if self.state.at_end() {
            self.phase = PlaybackPhase::Paused;
        } else {
            self.phase = PlaybackPhase::Playing;
            self.scheduler.start(self.generation);
        }
        tracing::info!(generation = %self.generation, frames, "Batch run loaded");
        SourceOutcome::Started {
            frames: Some(frames),
        }
    }
}

fn apply_index(run: &RunResult, index: usize, sink: &mut dyn FrameSink) {
    if let Some(frame) = run.frame(index) {
        sink.set_current_frame(frame.clone());
    }
    if let Some(sample) = run.sample(index) {
        sink.append_sample(*sample);
    }
}

impl<S: TickScheduler> DataSource for PlaybackController<S> {
    fn mode(&self) -> RunMode {
        RunMode::Batch
    }

    fn generation(&self) -> Generation {
        self.generation
    }

    fn phase_name(&self) -> &'static str {
        self.phase.name()
    }

    fn is_active(&self) -> bool {
        matches!(self.phase, PlaybackPhase::Loading | PlaybackPhase::Playing)
    }

    fn handle(&mut self, event: Tagged<SourceEvent>, sink: &mut dyn FrameSink) -> SourceOutcome {
        if event.generation != self.generation {
            return SourceOutcome::Ignored;
        }
        match event.event {
            SourceEvent::Tick => {
                self.scheduler.acknowledge();
                self.tick(sink)
            }
            SourceEvent::BatchLoaded(result) => self.on_loaded(result, sink),
            SourceEvent::Stream(_) => SourceOutcome::Ignored,
        }
    }

    fn stop(&mut self) {
        self.scheduler.stop();
        self.request = None;
        self.phase = match self.phase {
            PlaybackPhase::Loading => PlaybackPhase::Idle,
            PlaybackPhase::Playing => PlaybackPhase::Paused,
            other => other,
        };
    }

    fn progress(&self) -> Option<(usize, usize)> {
        let run = self.state.run.as_ref()?;
        Some((self.state.current_index, run.len()))
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        PlaybackController::pause(self)
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        PlaybackController::play(self)
    }

    fn reset(&mut self, sink: &mut dyn FrameSink) -> Result<(), PlaybackError> {
        PlaybackController::reset(self, sink);
        Ok(())
    }
}
