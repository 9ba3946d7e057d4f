//! Render-side view of the touch channel.
//!
//! [`LatencyMonitor`] is what a render loop keeps between frames: the newest
//! sample, whether a device is present, a bounded history of real latencies
//! and the running peak. The poller retains nothing; history lives here.
//!
//! # Semantics
//! - Feed it once per frame with whatever [`SampleReceiver::drain_latest`]
//!   returned (`None` when the queue was empty keeps the previous sample).
//! - Sentinel samples mark the device absent and never enter history or peak.
//! - History is capped; the oldest latency is dropped first.
//!
//! [`SampleReceiver::drain_latest`]: crate::ipc::SampleReceiver::drain_latest

use crate::sample::TouchSample;
use std::collections::VecDeque;

pub const DEFAULT_HISTORY: usize = 120;

#[derive(Clone, Debug)]
pub struct LatencyMonitor {
    last: TouchSample,
    history: VecDeque<f64>,
    capacity: usize,
    peak: f64,
}

impl Default for LatencyMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

impl LatencyMonitor {
    pub fn new(capacity: usize) -> Self {
        Self {
            last: TouchSample::idle(),
            history: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            peak: 0.0,
        }
    }

    /// Record this frame's sample, if one arrived.
    pub fn update(&mut self, sample: Option<TouchSample>) -> TouchSample {
        if let Some(s) = sample {
            if !s.is_sentinel() {
                if self.history.len() == self.capacity {
                    self.history.pop_front();
                }
                self.history.push_back(s.latency_ms);
                self.peak = self.peak.max(s.latency_ms);
            }
            self.last = s;
        }
        self.last
    }

    #[inline]
    pub fn last(&self) -> TouchSample {
        self.last
    }

    #[inline]
    pub fn device_present(&self) -> bool {
        !self.last.is_sentinel()
    }

    #[inline]
    pub fn peak(&self) -> f64 {
        self.peak
    }

    pub fn mean(&self) -> Option<f64> {
        if self.history.is_empty() {
            return None;
        }
        Some(self.history.iter().sum::<f64>() / self.history.len() as f64)
    }

    pub fn history(&self) -> impl Iterator<Item = f64> + '_ {
        self.history.iter().copied()
    }

    pub fn reset_peak(&mut self) {
        self.peak = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_do_not_pollute_stats() {
        let mut m = LatencyMonitor::new(4);
        m.update(Some(TouchSample::new(2.0, false, 0, 0)));
        m.update(Some(TouchSample::sentinel()));
        assert!(!m.device_present());
        assert_eq!(m.peak(), 2.0);
        assert_eq!(m.history().count(), 1);
    }

    #[test]
    fn empty_frame_keeps_last_sample() {
        let mut m = LatencyMonitor::default();
        m.update(Some(TouchSample::new(1.0, true, 5, 6)));
        let kept = m.update(None);
        assert!(kept.pressed);
        assert_eq!((kept.x, kept.y), (5, 6));
    }

    #[test]
    fn history_is_bounded() {
        let mut m = LatencyMonitor::new(3);
        for i in 1..=5 {
            m.update(Some(TouchSample::new(f64::from(i), false, 0, 0)));
        }
        assert_eq!(m.history().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
        assert_eq!(m.mean(), Some(4.0));
        assert_eq!(m.peak(), 5.0);
    }

    #[test]
    fn peak_restarts_after_reset() {
        let mut m = LatencyMonitor::default();
        m.update(Some(TouchSample::new(9.0, false, 0, 0)));
        m.reset_peak();
        assert_eq!(m.peak(), 0.0);
        m.update(Some(TouchSample::new(1.5, false, 0, 0)));
        assert_eq!(m.peak(), 1.5);
    }
}
