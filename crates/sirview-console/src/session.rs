//! One viewer session: the client, both data sources and the view they
//! write into.
//!
//! Background work (the batch request, the stream reader, the playback
//! clock) never touches the view. It sends tagged events into the channel
//! returned by [`Session::new`]; whoever owns the session drains that
//! channel and passes each event to [`Session::handle`].

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use sirview_network::TransportClient;
use sirview_protocol::{ProtocolError, SimulationParams, LIVE_HISTORY_CAPACITY, PLAYBACK_TICK_MS};
use sirview_state::{
    DataSource, EventReceiver, EventSender, Generation, GenerationCounter, IntervalScheduler,
    PlaybackController, PlaybackError, RunMode, SourceEvent, SourceOutcome, StreamConsumer,
    Tagged, TaskGuard, ViewState,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("unknown parameter '{0}' (expected population, duration, transmission, recovery or speed)")]
    UnknownField(String),
    #[error("'{value}' is not a valid value for {field}")]
    BadValue { field: &'static str, value: String },
    #[error(transparent)]
    Rejected(#[from] ProtocolError),
}

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub tick_period: Duration,
    pub live_history: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(PLAYBACK_TICK_MS),
            live_history: LIVE_HISTORY_CAPACITY,
        }
    }
}

pub struct Session {
    client: TransportClient,
    events: EventSender,
    generations: GenerationCounter,
    params: SimulationParams,
    playback: PlaybackController<IntervalScheduler>,
    live: StreamConsumer,
    mode: Option<RunMode>,
    view: ViewState,
}

impl Session {
    /// Build a session. Must be called inside a tokio runtime; runs spawn
    /// their background work onto it.
    pub fn new(
        client: TransportClient,
        params: SimulationParams,
        settings: SessionSettings,
    ) -> (Self, EventReceiver) {
        let (events, rx) = mpsc::unbounded_channel();
        let scheduler = IntervalScheduler::new(settings.tick_period, events.clone());
        let session = Self {
            client,
            events,
            generations: GenerationCounter::new(),
            params,
            playback: PlaybackController::new(scheduler),
            live: StreamConsumer::new(settings.live_history),
            mode: None,
            view: ViewState::new(),
        };
        (session, rx)
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn client(&self) -> &TransportClient {
        &self.client
    }

    pub fn mode(&self) -> Option<RunMode> {
        self.mode
    }

    pub fn live(&self) -> &StreamConsumer {
        &self.live
    }

    pub fn playback(&self) -> &PlaybackController<IntervalScheduler> {
        &self.playback
    }

    /// The source serving the current run, if any run was started.
    pub fn active(&self) -> Option<&dyn DataSource> {
        match self.mode? {
            RunMode::Batch => Some(&self.playback),
            RunMode::Live => Some(&self.live),
        }
    }

    fn split(&mut self) -> (Option<&mut dyn DataSource>, &mut ViewState) {
        let source: Option<&mut dyn DataSource> = match self.mode {
            Some(RunMode::Batch) => Some(&mut self.playback),
            Some(RunMode::Live) => Some(&mut self.live),
            None => None,
        };
        (source, &mut self.view)
    }

    /// Fetch a new batch run and replay it once loaded.
    pub fn start_batch(&mut self) -> Generation {
        self.stop();
        let generation = self.generations.advance();
        let client = self.client.clone();
        let params = self.params.clone();
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            let result = client.run_batch(&params).await;
            let _ = events.send(Tagged::new(generation, SourceEvent::BatchLoaded(result)));
        });
        self.playback
            .begin(generation, Some(TaskGuard::new(task.abort_handle())));
        self.mode = Some(RunMode::Batch);
        tracing::info!(%generation, population = self.params.population_size, duration = self.params.duration, "Started batch run");
        generation
    }

    /// Subscribe to the live stream.
    pub fn start_live(&mut self) -> Generation {
        self.stop();
        let generation = self.generations.advance();
        let events = self.events.clone();
        let subscription = self.client.open_stream(&self.params, move |event| {
            events
                .send(Tagged::new(generation, SourceEvent::Stream(event)))
                .is_ok()
        });
        self.live.begin(generation, Some(subscription));
        self.mode = Some(RunMode::Live);
        tracing::info!(%generation, population = self.params.population_size, "Started live run");
        generation
    }

    /// Stop whatever is running. The view keeps its last frame and history.
    pub fn stop(&mut self) {
        self.playback.stop();
        self.live.stop();
    }

    pub fn handle(&mut self, event: Tagged<SourceEvent>) -> SourceOutcome {
        match self.split() {
            (Some(source), view) => source.handle(event, view),
            (None, _) => SourceOutcome::Ignored,
        }
    }

    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        match self.split() {
            (Some(source), _) => source.pause(),
            (None, _) => Err(PlaybackError::NoFrames),
        }
    }

    pub fn play(&mut self) -> Result<(), PlaybackError> {
        match self.split() {
            (Some(source), _) => source.play(),
            (None, _) => Err(PlaybackError::NoFrames),
        }
    }

    pub fn reset(&mut self) -> Result<(), PlaybackError> {
        match self.split() {
            (Some(source), view) => source.reset(view),
            (None, _) => Err(PlaybackError::NoFrames),
        }
    }

    /// Change one parameter for the next run. The current run is unaffected.
    pub fn set_param(&mut self, field: &str, value: &str) -> Result<(), ParamError> {
        let mut next = self.params.clone();
        apply_param(&mut next, field, value)?;
        next.validate()?;
        self.params = next;
        Ok(())
    }
}

fn apply_param(params: &mut SimulationParams, field: &str, value: &str) -> Result<(), ParamError> {
    fn parse<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ParamError> {
        value.trim().parse().map_err(|_| ParamError::BadValue {
            field,
            value: value.to_string(),
        })
    }

    match field {
        "population" | "population_size" | "populationSize" => {
            params.population_size = parse("population", value)?
        }
        "duration" => params.duration = parse("duration", value)?,
        "transmission" | "transmission_rate" | "transmissionRate" => {
            params.transmission_rate = parse("transmission", value)?
        }
        "recovery" | "recovery_rate" | "recoveryRate" => {
            params.recovery_rate = parse("recovery", value)?
        }
        "speed" | "movement_speed" | "movementSpeed" => {
            params.movement_speed = parse("speed", value)?
        }
        other => return Err(ParamError::UnknownField(other.to_string())),
    }
    Ok(())
}
