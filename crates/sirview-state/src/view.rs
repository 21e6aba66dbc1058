use sirview_protocol::{Frame, StatSample};

use crate::HistoryBuffer;

/// Consumer contract shared by both data sources.
pub trait FrameSink {
    /// Replace the frame shown on the canvas.
    fn set_current_frame(&mut self, frame: Frame);
    /// Append one sample to the chart history.
    fn append_sample(&mut self, sample: StatSample);
    /// Drop the chart history and bound it to `capacity` samples.
    fn reset_history(&mut self, capacity: usize);
}

/// Everything the renderers draw: the current frame and the sample history.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    current_frame: Option<Frame>,
    history: HistoryBuffer,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.current_frame.as_ref()
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }
}

impl FrameSink for ViewState {
    fn set_current_frame(&mut self, frame: Frame) {
        self.current_frame = Some(frame);
    }

    fn append_sample(&mut self, sample: StatSample) {
        self.history.append(sample);
    }

    fn reset_history(&mut self, capacity: usize) {
        self.history = HistoryBuffer::bounded(capacity);
    }
}
