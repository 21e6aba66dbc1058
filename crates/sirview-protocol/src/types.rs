use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Simulation parameters
// ---------------------------------------------------------------------------

/// Parameter snapshot captured when a run is submitted.
///
/// The viewer copies this value at run start; later edits to the editable
/// copy never reach an in-flight run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParams {
    pub population_size: u32,
    /// Number of steps after step 0. Only meaningful in batch mode.
    pub duration: u32,
    pub transmission_rate: f64,
    pub recovery_rate: f64,
    pub movement_speed: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            population_size: 200,
            duration: 300,
            transmission_rate: 0.2,
            recovery_rate: 0.05,
            movement_speed: 3.0,
        }
    }
}

impl SimulationParams {
    /// Reject snapshots the service would not accept.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.population_size == 0 {
            return Err(ProtocolError::InvalidParams(
                "populationSize must be greater than 0".into(),
            ));
        }
        if self.duration == 0 {
            return Err(ProtocolError::InvalidParams(
                "duration must be greater than 0".into(),
            ));
        }
        for (name, rate) in [
            ("transmissionRate", self.transmission_rate),
            ("recoveryRate", self.recovery_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ProtocolError::InvalidParams(format!(
                    "{name} must be within [0, 1], got {rate}"
                )));
            }
        }
        if !(self.movement_speed >= 0.0 && self.movement_speed.is_finite()) {
            return Err(ProtocolError::InvalidParams(format!(
                "movementSpeed must be a finite value >= 0, got {}",
                self.movement_speed
            )));
        }
        Ok(())
    }

    /// Query pairs for the stream endpoint. Duration is omitted: a live run
    /// lasts until the connection closes.
    pub fn stream_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("populationSize", self.population_size.to_string()),
            ("transmissionRate", self.transmission_rate.to_string()),
            ("recoveryRate", self.recovery_rate.to_string()),
            ("movementSpeed", self.movement_speed.to_string()),
        ]
    }

    /// Number of frames a complete batch run must contain.
    pub fn expected_frames(&self) -> usize {
        self.duration as usize + 1
    }
}

// ---------------------------------------------------------------------------
// Agents and frames
// ---------------------------------------------------------------------------

/// Health status of one simulated individual. Encoded as 0/1/2 on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AgentStatus {
    Susceptible,
    Infected,
    Recovered,
}

impl TryFrom<u8> for AgentStatus {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(AgentStatus::Susceptible),
            1 => Ok(AgentStatus::Infected),
            2 => Ok(AgentStatus::Recovered),
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

impl From<AgentStatus> for u8 {
    fn from(status: AgentStatus) -> u8 {
        match status {
            AgentStatus::Susceptible => 0,
            AgentStatus::Infected => 1,
            AgentStatus::Recovered => 2,
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Susceptible => "susceptible",
            Self::Infected => "infected",
            Self::Recovered => "recovered",
        };
        write!(f, "{s}")
    }
}

/// One simulated individual, in simulation coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub x: f64,
    pub y: f64,
    pub status: AgentStatus,
}

/// Snapshot of every agent at one time-step. Agent order is drawing order
/// only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub step: u64,
    #[serde(default)]
    pub agents: Vec<Agent>,
}

impl Frame {
    pub fn new(step: u64, agents: Vec<Agent>) -> Self {
        Self { step, agents }
    }

    /// Tally agents per compartment, in (s, i, r) order.
    pub fn tally(&self) -> (u32, u32, u32) {
        self.agents
            .iter()
            .fold((0, 0, 0), |(s, i, r), agent| match agent.status {
                AgentStatus::Susceptible => (s + 1, i, r),
                AgentStatus::Infected => (s, i + 1, r),
                AgentStatus::Recovered => (s, i, r + 1),
            })
    }
}

// ---------------------------------------------------------------------------
// Aggregate statistics
// ---------------------------------------------------------------------------

/// Per-step compartment counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSample {
    pub step: u64,
    pub s: u32,
    pub i: u32,
    pub r: u32,
}

impl StatSample {
    pub fn new(step: u64, s: u32, i: u32, r: u32) -> Self {
        Self { step, s, i, r }
    }

    pub fn total(&self) -> u64 {
        self.s as u64 + self.i as u64 + self.r as u64
    }
}

// ---------------------------------------------------------------------------
// Runs and stream messages
// ---------------------------------------------------------------------------

/// A complete, validated batch run: `frames[k].step == k` and one sample
/// per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub frames: Vec<Frame>,
    pub aggregate_stats: Vec<StatSample>,
}

impl RunResult {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.frames.len().checked_sub(1)
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn sample(&self, index: usize) -> Option<&StatSample> {
        self.aggregate_stats.get(index)
    }

    /// Step with the most infected agents (first one on ties).
    pub fn peak_infected(&self) -> Option<&StatSample> {
        self.aggregate_stats
            .iter()
            .reduce(|best, s| if s.i > best.i { s } else { best })
    }
}

/// One live tick: the frame and its aggregate sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    pub frame: Frame,
    pub stats: StatSample,
}
