use std::convert::Infallible;
use std::time::Duration;

use axum::{
    response::sse::{Event, Sse},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use sirview_console::{headless, Session, SessionSettings};
use sirview_network::{ClientError, TransportClient, TransportConfig};
use sirview_protocol::{Frame, ProtocolError, RunResult, SimulationParams, StatSample};
use sirview_state::{
    DataSource, EventReceiver, RunMode, SourceEvent, SourceOutcome, Tagged, TickScheduler,
};

// ─── Mock service ───────────────────────────────────────────

fn sample_json(step: u64, population: u64) -> Value {
    let i = step % (population + 1);
    json!({ "step": step, "s": population - i, "i": i, "r": 0 })
}

fn frame_json(step: u64, population: u64) -> Value {
    let agents: Vec<Value> = (0..population)
        .map(|n| json!({ "x": n as f64, "y": step as f64, "status": 0 }))
        .collect();
    json!({ "step": step, "agents": agents })
}

/// Answers a duration of 13 with a body missing `aggregateStats`.
async fn run_handler(Json(body): Json<Value>) -> Json<Value> {
    let population = body["populationSize"].as_u64().unwrap_or(0);
    let duration = body["duration"].as_u64().unwrap_or(0);
    if duration == 13 {
        return Json(json!({ "frames": [] }));
    }
    Json(json!({
        "frames": (0..=duration).map(|s| frame_json(s, population)).collect::<Vec<_>>(),
        "aggregateStats": (0..=duration).map(|s| sample_json(s, population)).collect::<Vec<_>>(),
    }))
}

async fn stream_handler() -> Sse<impl futures_util::Stream<Item = Result<Event, Infallible>>> {
    let events: Vec<Event> = (0..150u64)
        .map(|step| {
            Event::default().data(
                json!({ "frame": frame_json(step, 3), "stats": sample_json(step, 3) }).to_string(),
            )
        })
        .collect();
    Sse::new(futures_util::stream::iter(events.into_iter().map(Ok)))
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route("/api/simulation/run", post(run_handler))
        .route("/api/simulation/stream", get(stream_handler))
        .route(
            "/api/simulation/health",
            get(|| async { "Simulator Backend is running" }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base: &str) -> TransportClient {
    TransportClient::new(TransportConfig::with_base_url(base)).unwrap()
}

fn params(population_size: u32, duration: u32) -> SimulationParams {
    SimulationParams {
        population_size,
        duration,
        ..Default::default()
    }
}

fn fast() -> SessionSettings {
    SessionSettings {
        tick_period: Duration::from_millis(2),
        live_history: 100,
    }
}

/// Drain events into the session until `done` holds or the deadline passes.
async fn pump(
    session: &mut Session,
    rx: &mut EventReceiver,
    mut done: impl FnMut(&Session, &SourceOutcome) -> bool,
) -> Vec<SourceOutcome> {
    let mut outcomes = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let event = tokio::time::timeout_at(deadline, rx.recv())
            .await
            .expect("event before deadline")
            .expect("channel open");
        let outcome = session.handle(event);
        let finished = done(session, &outcome);
        outcomes.push(outcome);
        if finished {
            return outcomes;
        }
    }
}

// ─── Batch ──────────────────────────────────────────────────

#[tokio::test]
async fn test_batch_run_plays_to_the_end_and_pauses() {
    let base = spawn_server().await;
    let (mut session, mut rx) = Session::new(client(&base), params(5, 30), fast());

    let generation = session.start_batch();
    let outcomes = pump(&mut session, &mut rx, |_, o| *o == SourceOutcome::Finished).await;

    assert_eq!(outcomes[0], SourceOutcome::Started { frames: Some(31) });
    let applied = outcomes
        .iter()
        .filter(|o| **o == SourceOutcome::Applied)
        .count();
    assert_eq!(applied, 29);

    let source = session.active().unwrap();
    assert_eq!(source.generation(), generation);
    assert_eq!(source.phase_name(), "paused");
    assert_eq!(source.progress(), Some((30, 31)));
    assert_eq!(session.view().current_frame().map(|f| f.step), Some(30));
    let steps: Vec<u64> = session.view().history().iter().map(|s| s.step).collect();
    assert_eq!(steps, (0..=30).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_malformed_batch_leaves_view_untouched() {
    let base = spawn_server().await;
    let (mut session, mut rx) = Session::new(client(&base), params(5, 4), fast());
    session.start_batch();
    pump(&mut session, &mut rx, |_, o| *o == SourceOutcome::Finished).await;
    let before = session.view().clone();

    session.set_param("duration", "13").unwrap();
    session.start_batch();
    let outcomes = pump(&mut session, &mut rx, |_, o| {
        matches!(o, SourceOutcome::Failed(_))
    })
    .await;

    assert!(matches!(
        outcomes.last(),
        Some(SourceOutcome::Failed(ClientError::Protocol(
            ProtocolError::MissingField("aggregateStats")
        )))
    ));
    assert_eq!(session.active().map(|s| s.phase_name()), Some("idle"));
    assert_eq!(session.view(), &before);
    // The earlier run can still be replayed.
    session.reset().unwrap();
    assert_eq!(session.view().current_frame().map(|f| f.step), Some(0));
}

#[tokio::test]
async fn test_restarting_discards_the_previous_run() {
    let base = spawn_server().await;
    let (mut session, mut rx) = Session::new(client(&base), params(5, 200), fast());

    let first = session.start_batch();
    let second = session.start_batch();
    assert!(second > first);

    let outcomes = pump(&mut session, &mut rx, |_, o| {
        matches!(o, SourceOutcome::Started { .. })
    })
    .await;
    assert_eq!(outcomes.last(), Some(&SourceOutcome::Started { frames: Some(201) }));
    assert_eq!(session.active().map(|s| s.generation()), Some(second));
    session.stop();
    session.stop();
}

// ─── Live ───────────────────────────────────────────────────

#[tokio::test]
async fn test_live_run_keeps_latest_hundred_samples() {
    let base = spawn_server().await;
    let (mut session, mut rx) = Session::new(client(&base), params(3, 10), fast());

    session.start_live();
    let outcomes = pump(&mut session, &mut rx, |_, o| *o == SourceOutcome::Finished).await;

    assert_eq!(outcomes[0], SourceOutcome::Started { frames: None });
    assert_eq!(session.live().received(), 150);
    let steps: Vec<u64> = session.view().history().iter().map(|s| s.step).collect();
    assert_eq!(steps, (50..150).collect::<Vec<_>>());
    assert_eq!(session.view().current_frame().map(|f| f.step), Some(149));
    assert!(!session.active().unwrap().is_active());
}

#[tokio::test]
async fn test_switching_to_live_ignores_leftover_batch_events() {
    let base = spawn_server().await;
    let (mut session, mut rx) = Session::new(client(&base), params(3, 200), fast());

    let batch = session.start_batch();
    pump(&mut session, &mut rx, |_, o| {
        matches!(o, SourceOutcome::Started { .. })
    })
    .await;
    assert!(session.playback().scheduler().is_running());

    let live = session.start_live();
    assert!(live > batch);
    assert_eq!(session.mode(), Some(RunMode::Live));
    assert!(!session.playback().scheduler().is_running());
    let before = session.view().clone();

    let late_run = RunResult {
        frames: vec![Frame::new(0, Vec::new())],
        aggregate_stats: vec![StatSample::new(0, 3, 0, 0)],
    };
    assert_eq!(
        session.handle(Tagged::new(batch, SourceEvent::Tick)),
        SourceOutcome::Ignored
    );
    assert_eq!(
        session.handle(Tagged::new(batch, SourceEvent::BatchLoaded(Ok(late_run)))),
        SourceOutcome::Ignored
    );
    assert_eq!(session.view(), &before);

    pump(&mut session, &mut rx, |_, o| *o == SourceOutcome::Finished).await;
    assert_eq!(session.active().map(|s| s.generation()), Some(live));
    let steps: Vec<u64> = session.view().history().iter().map(|s| s.step).collect();
    assert_eq!(steps, (50..150).collect::<Vec<_>>());
}

// ─── Headless ───────────────────────────────────────────────

#[tokio::test]
async fn test_headless_commands_print_summaries() {
    let base = spawn_server().await;
    let client = client(&base);

    let mut out = Vec::new();
    headless::run_batch(&client, &params(4, 10), &mut out)
        .await
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("frames: 11"));
    assert!(text.contains("peak infected: 4 at step 4"));

    let mut out = Vec::new();
    let printed = headless::follow_stream(&client, &params(3, 10), Some(5), &mut out)
        .await
        .unwrap();
    assert_eq!(printed, 5);
    assert_eq!(String::from_utf8(out).unwrap().lines().count(), 5);

    let mut out = Vec::new();
    headless::health(&client, &mut out).await.unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "Simulator Backend is running\n");
}
