//! Integrity checks applied to decoded payloads before they are accepted.

use crate::{ProtocolError, RunResult, SimulationParams, StatSample};

/// Compartment counts must account for the whole population.
pub fn check_sample(sample: &StatSample, population_size: u32) -> Result<(), ProtocolError> {
    let total = sample.total();
    if total != population_size as u64 {
        return Err(ProtocolError::PopulationMismatch {
            step: sample.step,
            total,
            expected: population_size as u64,
        });
    }
    Ok(())
}

/// A complete run has `duration + 1` frames with gapless steps starting at
/// 0, a parallel sample per frame, and conserved population counts.
pub fn check_run_result(run: &RunResult, params: &SimulationParams) -> Result<(), ProtocolError> {
    if run.frames.len() != run.aggregate_stats.len() {
        return Err(ProtocolError::LengthMismatch {
            frames: run.frames.len(),
            stats: run.aggregate_stats.len(),
        });
    }

    let expected = params.expected_frames();
    if run.frames.len() != expected {
        return Err(ProtocolError::DurationMismatch {
            expected,
            actual: run.frames.len(),
        });
    }

    for (index, (frame, sample)) in run.frames.iter().zip(&run.aggregate_stats).enumerate() {
        if frame.step != index as u64 {
            return Err(ProtocolError::StepGap {
                kind: "frame",
                index,
                step: frame.step,
            });
        }
        if sample.step != index as u64 {
            return Err(ProtocolError::StepGap {
                kind: "sample",
                index,
                step: sample.step,
            });
        }
        check_sample(sample, params.population_size)?;
    }

    Ok(())
}
