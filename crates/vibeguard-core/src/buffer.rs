//! Acquisition buffer: fixed-capacity FIFO ring of raw samples.

use std::collections::VecDeque;

/// Ring of the most recent raw samples, oldest first.
///
/// Only the acquisition side mutates it; readers take a [`snapshot`](Self::snapshot).
#[derive(Debug, Clone)]
pub struct AcquisitionBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
    total_pushed: u64,
}

impl AcquisitionBuffer {
    /// Create an empty buffer. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            total_pushed: 0,
        }
    }

    /// Append a sample, evicting the oldest one when full.
    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        self.total_pushed += 1;
    }

    /// Owned copy of the current contents in arrival order.
    pub fn snapshot(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples ever pushed, including evicted ones.
    pub fn total_pushed(&self) -> u64 {
        self.total_pushed
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_when_full() {
        let mut buf = AcquisitionBuffer::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            buf.push(v);
        }
        assert_eq!(buf.snapshot(), vec![2.0, 3.0, 4.0]);
        assert_eq!(buf.total_pushed(), 4);
    }

    #[test]
    fn length_is_min_of_pushed_and_capacity() {
        for capacity in [1, 2, 5, 40, 300] {
            for n in [0usize, 1, 4, 39, 40, 41, 299, 300, 301, 1000] {
                let mut buf = AcquisitionBuffer::new(capacity);
                for i in 0..n {
                    buf.push(i as f64);
                }
                assert_eq!(buf.len(), n.min(capacity));
                let expected: Vec<f64> = (n.saturating_sub(capacity)..n).map(|i| i as f64).collect();
                assert_eq!(buf.snapshot(), expected, "capacity {capacity}, n {n}");
            }
        }
    }

    #[test]
    fn snapshot_is_detached() {
        let mut buf = AcquisitionBuffer::new(4);
        buf.push(1.0);
        let snap = buf.snapshot();
        buf.push(2.0);
        assert_eq!(snap, vec![1.0]);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buf = AcquisitionBuffer::new(0);
        buf.push(1.0);
        buf.push(2.0);
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.snapshot(), vec![2.0]);
        assert!(buf.is_full());
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut buf = AcquisitionBuffer::new(2);
        buf.push(1.0);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 2);
    }
}
