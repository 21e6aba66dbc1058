//! Wire envelopes for the two service endpoints.
//!
//! Responses are first decoded into envelopes whose required fields are
//! optional, so that an absent `frames` or `aggregateStats` is reported as
//! [`ProtocolError::MissingField`] instead of a generic decode failure.
//! Envelopes are only turned into [`RunResult`] / [`StreamMessage`] after the
//! integrity checks pass.

use serde::Deserialize;

use crate::integrity::{check_run_result, check_sample};
use crate::{Frame, ProtocolError, RunResult, SimulationParams, StatSample, StreamMessage};
use crate::ERROR_BODY_LIMIT;

/// Body of a successful `POST /api/simulation/run`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub frames: Option<Vec<Frame>>,
    pub aggregate_stats: Option<Vec<StatSample>>,
}

impl RunResponse {
    /// Check presence and integrity, producing a run that is safe to hand
    /// to playback.
    pub fn into_run_result(self, params: &SimulationParams) -> Result<RunResult, ProtocolError> {
        let frames = self.frames.ok_or(ProtocolError::MissingField("frames"))?;
        let aggregate_stats = self
            .aggregate_stats
            .ok_or(ProtocolError::MissingField("aggregateStats"))?;
        let run = RunResult {
            frames,
            aggregate_stats,
        };
        check_run_result(&run, params)?;
        Ok(run)
    }
}

/// Decode and validate a batch response body in one step.
pub fn decode_run_result(body: &[u8], params: &SimulationParams) -> Result<RunResult, ProtocolError> {
    let response: RunResponse = serde_json::from_slice(body)?;
    response.into_run_result(params)
}

/// One `data:` payload of the live stream.
#[derive(Debug, Deserialize)]
pub struct StreamPayload {
    pub frame: Option<Frame>,
    pub stats: Option<StatSample>,
}

impl StreamPayload {
    pub fn into_message(self, population_size: u32) -> Result<StreamMessage, ProtocolError> {
        let frame = self.frame.ok_or(ProtocolError::MissingField("frame"))?;
        let stats = self.stats.ok_or(ProtocolError::MissingField("stats"))?;
        check_sample(&stats, population_size)?;
        Ok(StreamMessage { frame, stats })
    }
}

/// Decode one stream payload. Failures here concern this message only.
pub fn decode_stream_message(data: &str, population_size: u32) -> Result<StreamMessage, ProtocolError> {
    let payload: StreamPayload = serde_json::from_str(data)?;
    payload.into_message(population_size)
}

/// Cut an error body down to [`ERROR_BODY_LIMIT`] bytes on a char boundary.
pub fn truncate_body(body: &str) -> String {
    if body.len() <= ERROR_BODY_LIMIT {
        return body.to_string();
    }
    let mut end = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
