use std::collections::VecDeque;

use sirview_protocol::StatSample;

/// FIFO of aggregate samples feeding the chart.
///
/// Bounded buffers evict from the head (oldest first) so that
/// `len() <= capacity` holds after every append.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryBuffer {
    samples: VecDeque<StatSample>,
    capacity: Option<usize>,
}

impl HistoryBuffer {
    pub fn bounded(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(4096)),
            capacity: Some(capacity),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn append(&mut self, sample: StatSample) {
        self.samples.push_back(sample);
        if let Some(cap) = self.capacity {
            while self.samples.len() > cap {
                self.samples.pop_front();
            }
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&StatSample> {
        self.samples.back()
    }

    /// Samples in arrival order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &StatSample> + ExactSizeIterator + '_ {
        self.samples.iter()
    }

    pub fn to_vec(&self) -> Vec<StatSample> {
        self.samples.iter().copied().collect()
    }
}
