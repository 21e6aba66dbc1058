use std::time::Duration;

use sirview_network::{ClientError, StreamEvent};
use sirview_protocol::{
    Agent, AgentStatus, Frame, ProtocolError, RunResult, StatSample, StreamMessage,
};
use sirview_state::{
    DataSource, FrameSink, Generation, GenerationCounter, IntervalScheduler, PlaybackController,
    PlaybackError, PlaybackPhase, SourceEvent, SourceOutcome, StreamConsumer, Tagged,
    TickScheduler, ViewState,
};

// ─── Fixtures ───────────────────────────────────────────────

/// Clock driven by hand; records every start.
#[derive(Default)]
struct ManualClock {
    running: bool,
    starts: Vec<Generation>,
}

impl TickScheduler for ManualClock {
    fn start(&mut self, generation: Generation) {
        self.running = true;
        self.starts.push(generation);
    }
    fn stop(&mut self) {
        self.running = false;
    }
    fn is_running(&self) -> bool {
        self.running
    }
}

fn frame(step: u64) -> Frame {
    Frame::new(
        step,
        vec![Agent {
            x: step as f64,
            y: 0.0,
            status: AgentStatus::Infected,
        }],
    )
}

fn sample(step: u64) -> StatSample {
    StatSample::new(step, 0, 1, 0)
}

fn run(frames: u64) -> RunResult {
    RunResult {
        frames: (0..frames).map(frame).collect(),
        aggregate_stats: (0..frames).map(sample).collect(),
    }
}

fn message(step: u64) -> StreamMessage {
    StreamMessage {
        frame: frame(step),
        stats: sample(step),
    }
}

fn loaded(g: Generation, frames: u64) -> Tagged<SourceEvent> {
    Tagged::new(g, SourceEvent::BatchLoaded(Ok(run(frames))))
}

fn tick(g: Generation) -> Tagged<SourceEvent> {
    Tagged::new(g, SourceEvent::Tick)
}

fn stream(g: Generation, event: StreamEvent) -> Tagged<SourceEvent> {
    Tagged::new(g, SourceEvent::Stream(event))
}

fn history_steps(view: &ViewState) -> Vec<u64> {
    view.history().iter().map(|s| s.step).collect()
}

// ─── Batch playback ─────────────────────────────────────────

#[test]
fn test_load_starts_playing_at_frame_zero() {
    let mut counter = GenerationCounter::new();
    let g = counter.advance();
    let mut view = ViewState::new();
    let mut pc = PlaybackController::new(ManualClock::default());

    pc.begin(g, None);
    assert_eq!(pc.phase(), PlaybackPhase::Loading);
    assert!(pc.is_active());

    let outcome = pc.handle(loaded(g, 301), &mut view);
    assert_eq!(outcome, SourceOutcome::Started { frames: Some(301) });
    assert_eq!(pc.phase(), PlaybackPhase::Playing);
    assert_eq!(pc.state().current_index(), 0);
    assert_eq!(view.current_frame().map(|f| f.step), Some(0));
    assert_eq!(history_steps(&view), vec![0]);
    assert_eq!(view.history().capacity(), Some(301));
    assert_eq!(pc.scheduler().starts, vec![g]);
}

#[test]
fn test_playback_advances_one_frame_per_tick_and_pauses_at_end() {
    let mut counter = GenerationCounter::new();
    let g = counter.advance();
    let mut view = ViewState::new();
    let mut pc = PlaybackController::new(ManualClock::default());
    pc.begin(g, None);
    pc.handle(loaded(g, 10), &mut view);

    let mut indices = vec![pc.state().current_index()];
    let mut last = SourceOutcome::Ignored;
    for _ in 0..9 {
        last = pc.handle(tick(g), &mut view);
        indices.push(pc.state().current_index());
    }
    assert_eq!(indices, (0..10).collect::<Vec<_>>());
    assert_eq!(last, SourceOutcome::Finished);
    assert_eq!(pc.phase(), PlaybackPhase::Paused);
    assert!(!pc.scheduler().is_running());
    assert_eq!(view.current_frame().map(|f| f.step), Some(9));
    assert_eq!(history_steps(&view), (0..10).collect::<Vec<_>>());

    // Late ticks after the auto-pause change nothing.
    assert_eq!(pc.handle(tick(g), &mut view), SourceOutcome::Ignored);
    assert_eq!(pc.state().current_index(), 9);
    assert_eq!(pc.play(), Err(PlaybackError::AtEnd));
}

#[tokio::test]
async fn test_stalled_consumer_resumes_one_frame_at_a_time() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut counter = GenerationCounter::new();
    let g = counter.advance();
    let mut view = ViewState::new();
    let mut pc = PlaybackController::new(IntervalScheduler::new(Duration::from_millis(5), tx));
    pc.begin(g, None);
    pc.handle(loaded(g, 301), &mut view);

    // Many periods pass with nobody draining the channel.
    tokio::time::sleep(Duration::from_millis(200)).await;
    while let Ok(event) = rx.try_recv() {
        pc.handle(event, &mut view);
    }
    assert_eq!(pc.state().current_index(), 1);

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("tick after acknowledge")
        .expect("channel open");
    assert_eq!(pc.handle(event, &mut view), SourceOutcome::Applied);
    assert_eq!(pc.state().current_index(), 2);
    DataSource::stop(&mut pc);
}

#[test]
fn test_pause_play_and_reset() {
    let mut counter = GenerationCounter::new();
    let g = counter.advance();
    let mut view = ViewState::new();
    let mut pc = PlaybackController::new(ManualClock::default());
    pc.begin(g, None);
    pc.handle(loaded(g, 20), &mut view);
    for _ in 0..5 {
        pc.handle(tick(g), &mut view);
    }

    pc.pause().unwrap();
    assert_eq!(pc.phase(), PlaybackPhase::Paused);
    assert!(!pc.scheduler().is_running());
    assert_eq!(pc.handle(tick(g), &mut view), SourceOutcome::Ignored);
    assert_eq!(pc.state().current_index(), 5);

    pc.play().unwrap();
    assert!(pc.is_playing());
    assert!(pc.scheduler().is_running());
    pc.handle(tick(g), &mut view);
    assert_eq!(pc.state().current_index(), 6);

    pc.reset(&mut view);
    assert_eq!(pc.phase(), PlaybackPhase::Paused);
    assert_eq!(pc.state().current_index(), 0);
    assert!(!pc.scheduler().is_running());
    assert_eq!(view.current_frame().map(|f| f.step), Some(0));
    assert_eq!(history_steps(&view), vec![0]);

    pc.play().unwrap();
    pc.handle(tick(g), &mut view);
    assert_eq!(history_steps(&view), vec![0, 1]);
}

#[test]
fn test_failed_load_returns_to_idle_and_keeps_view() {
    let mut counter = GenerationCounter::new();
    let first = counter.advance();
    let mut view = ViewState::new();
    let mut pc = PlaybackController::new(ManualClock::default());
    pc.begin(first, None);
    pc.handle(loaded(first, 4), &mut view);
    pc.handle(tick(first), &mut view);
    let before = view.clone();

    let second = counter.advance();
    pc.begin(second, None);
    let error = ClientError::Protocol(ProtocolError::MissingField("aggregateStats"));
    let outcome = pc.handle(
        Tagged::new(second, SourceEvent::BatchLoaded(Err(error.clone()))),
        &mut view,
    );

    assert_eq!(outcome, SourceOutcome::Failed(error));
    assert_eq!(pc.phase(), PlaybackPhase::Idle);
    assert_eq!(view, before);
    // The earlier run is still loaded and can be replayed.
    assert_eq!(pc.state().frames().len(), 4);
    pc.reset(&mut view);
    pc.play().unwrap();
}

#[test]
fn test_play_after_failed_load_requires_reset() {
    let mut counter = GenerationCounter::new();
    let first = counter.advance();
    let mut view = ViewState::new();
    let mut pc = PlaybackController::new(ManualClock::default());
    pc.begin(first, None);
    pc.handle(loaded(first, 5), &mut view);

    let second = counter.advance();
    pc.begin(second, None);
    pc.handle(
        Tagged::new(
            second,
            SourceEvent::BatchLoaded(Err(ClientError::Protocol(ProtocolError::MissingField(
                "frames",
            )))),
        ),
        &mut view,
    );
    assert_eq!(pc.phase(), PlaybackPhase::Idle);

    assert_eq!(pc.play(), Err(PlaybackError::NotPaused));
    assert_eq!(pc.phase(), PlaybackPhase::Idle);
    assert!(!pc.scheduler().is_running());
    assert_eq!(pc.state().current_index(), 0);

    pc.reset(&mut view);
    assert_eq!(pc.play(), Ok(()));
    assert_eq!(pc.phase(), PlaybackPhase::Playing);
}

#[test]
fn test_stale_generation_is_ignored() {
    let mut counter = GenerationCounter::new();
    let old = counter.advance();
    let new = counter.advance();
    let mut view = ViewState::new();
    let mut pc = PlaybackController::new(ManualClock::default());

    pc.begin(old, None);
    pc.begin(new, None);
    assert_eq!(pc.handle(loaded(old, 50), &mut view), SourceOutcome::Ignored);
    assert!(view.current_frame().is_none());

    pc.handle(loaded(new, 3), &mut view);
    assert_eq!(pc.handle(tick(old), &mut view), SourceOutcome::Ignored);
    assert_eq!(pc.state().current_index(), 0);
    assert_eq!(pc.handle(tick(new), &mut view), SourceOutcome::Applied);
}

#[test]
fn test_new_run_while_playing_stops_clock() {
    let mut counter = GenerationCounter::new();
    let first = counter.advance();
    let mut view = ViewState::new();
    let mut pc = PlaybackController::new(ManualClock::default());
    pc.begin(first, None);
    pc.handle(loaded(first, 10), &mut view);
    assert!(pc.scheduler().is_running());

    let second = counter.advance();
    pc.begin(second, None);
    assert!(!pc.scheduler().is_running());
    assert_eq!(pc.phase(), PlaybackPhase::Loading);
    assert_eq!(pc.handle(tick(first), &mut view), SourceOutcome::Ignored);
}

#[test]
fn test_stop_is_idempotent_for_playback() {
    let mut counter = GenerationCounter::new();
    let g = counter.advance();
    let mut view = ViewState::new();
    let mut pc = PlaybackController::new(ManualClock::default());
    pc.begin(g, None);
    pc.handle(loaded(g, 10), &mut view);

    DataSource::stop(&mut pc);
    DataSource::stop(&mut pc);
    assert_eq!(pc.phase(), PlaybackPhase::Paused);
    assert!(!pc.scheduler().is_running());
}

// ─── Live streaming ─────────────────────────────────────────

#[test]
fn test_live_history_keeps_latest_hundred() {
    let mut counter = GenerationCounter::new();
    let g = counter.advance();
    let mut view = ViewState::new();
    let mut live = StreamConsumer::default();
    live.begin(g, None);

    assert_eq!(
        live.handle(stream(g, StreamEvent::Opened), &mut view),
        SourceOutcome::Started { frames: None }
    );
    for step in 0..150 {
        live.handle(stream(g, StreamEvent::Message(message(step))), &mut view);
    }

    assert_eq!(view.history().len(), 100);
    assert_eq!(history_steps(&view), (50..150).collect::<Vec<_>>());
    assert_eq!(view.current_frame().map(|f| f.step), Some(149));
    assert_eq!(live.received(), 150);
}

#[test]
fn test_opening_a_stream_clears_previous_history() {
    let mut counter = GenerationCounter::new();
    let mut view = ViewState::new();
    view.reset_history(500);
    for step in 0..300 {
        view.append_sample(sample(step));
    }

    let g = counter.advance();
    let mut live = StreamConsumer::default();
    live.begin(g, None);
    live.handle(stream(g, StreamEvent::Opened), &mut view);
    assert!(view.history().is_empty());
    assert_eq!(view.history().capacity(), Some(100));
}

#[test]
fn test_rejected_message_is_counted_and_stream_continues() {
    let mut counter = GenerationCounter::new();
    let g = counter.advance();
    let mut view = ViewState::new();
    let mut live = StreamConsumer::default();
    live.begin(g, None);
    live.handle(stream(g, StreamEvent::Opened), &mut view);
    live.handle(stream(g, StreamEvent::Message(message(0))), &mut view);

    let bad = ClientError::MessageParse(ProtocolError::Decode("expected value".into()));
    let outcome = live.handle(stream(g, StreamEvent::Rejected(bad.clone())), &mut view);
    assert_eq!(outcome, SourceOutcome::Dropped(bad));
    assert!(live.is_active());

    live.handle(stream(g, StreamEvent::Message(message(1))), &mut view);
    assert_eq!(live.dropped(), 1);
    assert_eq!(history_steps(&view), vec![0, 1]);
}

#[test]
fn test_connection_failure_returns_to_idle_and_keeps_view() {
    let mut counter = GenerationCounter::new();
    let g = counter.advance();
    let mut view = ViewState::new();
    let mut live = StreamConsumer::default();
    live.begin(g, None);
    live.handle(stream(g, StreamEvent::Opened), &mut view);
    live.handle(stream(g, StreamEvent::Message(message(0))), &mut view);
    let before = view.clone();

    let error = ClientError::StreamConnection("connection reset".into());
    let outcome = live.handle(stream(g, StreamEvent::Failed(error.clone())), &mut view);
    assert_eq!(outcome, SourceOutcome::Failed(error));
    assert!(!live.is_active());
    assert_eq!(view, before);

    // Nothing is applied once idle.
    assert_eq!(
        live.handle(stream(g, StreamEvent::Message(message(1))), &mut view),
        SourceOutcome::Ignored
    );
}

#[test]
fn test_stale_stream_events_are_ignored() {
    let mut counter = GenerationCounter::new();
    let old = counter.advance();
    let new = counter.advance();
    let mut view = ViewState::new();
    let mut live = StreamConsumer::default();

    live.begin(old, None);
    live.begin(new, None);
    live.handle(stream(new, StreamEvent::Opened), &mut view);
    assert_eq!(
        live.handle(stream(old, StreamEvent::Message(message(7))), &mut view),
        SourceOutcome::Ignored
    );
    assert!(view.current_frame().is_none());
}

#[test]
fn test_stop_is_idempotent_for_live() {
    let mut counter = GenerationCounter::new();
    let g = counter.advance();
    let mut view = ViewState::new();
    let mut live = StreamConsumer::default();
    live.begin(g, None);
    live.handle(stream(g, StreamEvent::Opened), &mut view);

    live.stop();
    live.stop();
    assert!(!live.is_active());
    assert_eq!(live.phase_name(), "idle");
    assert_eq!(live.pause(), Err(PlaybackError::Unsupported(live.mode())));
}
