//! Rolling sample buffer for a monitoring session.

use std::collections::VecDeque;

/// One signal sample: value plus capture timestamp in Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Signal amplitude (mV-equivalent for ECG)
    pub value: f64,
    /// Capture time in Unix milliseconds
    pub timestamp_ms: i64,
}

/// Ordered, capacity-bounded sequence of signal samples.
///
/// Owned exclusively by the monitoring session that produced it: the
/// producer appends, the buffer itself trims to capacity, and nothing
/// else writes. Oldest entries are evicted once capacity is exceeded.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleBuffer {
    /// Default capacity used by monitoring sessions.
    pub const DEFAULT_CAPACITY: usize = 300;

    /// Create a buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a buffer with an explicit capacity (must be non-zero).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest entry when full.
    pub fn push(&mut self, value: f64, timestamp_ms: i64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample {
            value,
            timestamp_ms,
        });
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Configured capacity bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Signal values in arrival order.
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// Iterate over samples in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Clear all samples (monitoring stopped).
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_read_back() {
        let mut buf = SampleBuffer::with_capacity(10);
        buf.push(0.5, 1000);
        buf.push(1.2, 1020);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.values(), vec![0.5, 1.2]);
    }

    #[test]
    fn capacity_is_never_exceeded() {
        let mut buf = SampleBuffer::with_capacity(3);
        for i in 0..10 {
            buf.push(i as f64, i * 20);
            assert!(buf.len() <= 3);
        }
        // Oldest entries evicted first
        assert_eq!(buf.values(), vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn clear_empties_the_buffer() {
        let mut buf = SampleBuffer::new();
        buf.push(1.0, 0);
        buf.clear();
        assert!(buf.is_empty());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let buf = SampleBuffer::with_capacity(0);
        assert_eq!(buf.capacity(), 1);
    }
}
