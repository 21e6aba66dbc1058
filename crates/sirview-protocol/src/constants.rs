/// Batch endpoint: one request, one complete run.
pub const RUN_PATH: &str = "/api/simulation/run";

/// Live endpoint: server-sent events, one payload per simulation tick.
pub const STREAM_PATH: &str = "/api/simulation/stream";

/// Liveness endpoint of the simulation service.
pub const HEALTH_PATH: &str = "/api/simulation/health";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Batch playback clock period (~20 steps per second).
pub const PLAYBACK_TICK_MS: u64 = 50;

/// Rolling history size while streaming.
pub const LIVE_HISTORY_CAPACITY: usize = 100;

/// Logical canvas size, in simulation coordinate units.
pub const CANVAS_WIDTH: f64 = 500.0;
pub const CANVAS_HEIGHT: f64 = 500.0;

/// Radius of one agent marker, in simulation coordinate units.
pub const AGENT_RADIUS: f64 = 3.0;

/// Error bodies longer than this are cut before being surfaced.
pub const ERROR_BODY_LIMIT: usize = 512;
