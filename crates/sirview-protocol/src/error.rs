use thiserror::Error;

/// Everything that can be wrong with a payload the service returned, or
/// with a parameter snapshot before it is sent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("invalid simulation parameters: {0}")]
    InvalidParams(String),

    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("failed to decode payload: {0}")]
    Decode(String),

    #[error("unknown agent status code {0}")]
    UnknownStatus(u8),

    #[error("run has {frames} frames but {stats} aggregate samples")]
    LengthMismatch { frames: usize, stats: usize },

    #[error("expected {expected} frames for the requested duration, got {actual}")]
    DurationMismatch { expected: usize, actual: usize },

    #[error("{kind} at index {index} has step {step}")]
    StepGap {
        kind: &'static str,
        index: usize,
        step: u64,
    },

    #[error("sample at step {step} counts {total} agents, population is {expected}")]
    PopulationMismatch { step: u64, total: u64, expected: u64 },
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::Decode(e.to_string())
    }
}
