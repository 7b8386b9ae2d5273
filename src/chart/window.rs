//! Sample Window
//!
//! Time-bounded, append-only sequence of samples. New samples go on the
//! back, expired samples come off the front. The newest sample is never
//! evicted, so a window that has seen one sample is never empty again.

use std::collections::VecDeque;

use super::error::{ChartError, ChartResult};
use super::types::Sample;

/// Five minutes, in milliseconds
pub const DEFAULT_SPAN_MS: i64 = 5 * 60 * 1000;

/// Ordered samples covering at most `span_ms` of time
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<Sample>,
    span_ms: i64,
}

impl SampleWindow {
    /// Create an empty window
    pub fn new(span_ms: i64) -> ChartResult<Self> {
        if span_ms <= 0 {
            return Err(ChartError::InvalidSpan(span_ms));
        }

        Ok(Self {
            samples: VecDeque::new(),
            span_ms,
        })
    }

    /// Create a window holding the two zero-value seed samples at
    /// `now - 2` and `now - 1`
    pub fn seeded(span_ms: i64, now: i64) -> ChartResult<Self> {
        let mut window = Self::new(span_ms)?;
        window.push(Sample::new(now - 2, 0.0));
        window.push(Sample::new(now - 1, 0.0));
        Ok(window)
    }

    /// Append a sample
    ///
    /// Timestamps are clamped to the newest retained timestamp so the
    /// window stays ordered when the wall clock steps backwards.
    pub fn push(&mut self, mut sample: Sample) {
        if let Some(newest) = self.samples.back() {
            sample.timestamp = sample.timestamp.max(newest.timestamp);
        }
        self.samples.push_back(sample);
    }

    /// Drop samples at least `span_ms` older than the newest one
    ///
    /// Returns the number of evicted samples.
    pub fn evict_expired(&mut self) -> usize {
        let Some(newest) = self.samples.back().map(|s| s.timestamp) else {
            return 0;
        };

        let mut evicted = 0;
        while self.samples.len() > 1 {
            match self.samples.front() {
                Some(oldest) if newest - oldest.timestamp >= self.span_ms => {
                    self.samples.pop_front();
                    evicted += 1;
                }
                _ => break,
            }
        }

        evicted
    }

    pub fn span_ms(&self) -> i64 {
        self.span_ms
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn oldest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn newest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Copy of the samples, oldest first
    pub fn to_vec(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    /// Earliest and latest timestamps
    pub fn time_extent(&self) -> Option<(i64, i64)> {
        Some((self.oldest()?.timestamp, self.newest()?.timestamp))
    }

    /// Largest reading in the window
    pub fn max_value(&self) -> Option<f64> {
        self.samples
            .iter()
            .map(|s| s.value)
            .reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_rejects_non_positive_span() {
        assert_eq!(SampleWindow::new(0).unwrap_err(), ChartError::InvalidSpan(0));
        assert!(SampleWindow::new(-5).is_err());
    }

    #[test]
    fn test_seeded_window() {
        let window = SampleWindow::seeded(DEFAULT_SPAN_MS, NOW).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window.time_extent(), Some((NOW - 2, NOW - 1)));
        assert_eq!(window.max_value(), Some(0.0));
    }

    #[test]
    fn test_push_keeps_order_on_clock_step_back() {
        let mut window = SampleWindow::new(DEFAULT_SPAN_MS).unwrap();
        window.push(Sample::new(NOW, 1.0));
        window.push(Sample::new(NOW - 500, 2.0));

        assert_eq!(window.newest().unwrap().timestamp, NOW);
        assert_eq!(window.newest().unwrap().value, 2.0);
    }

    #[test]
    fn test_evict_expired() {
        let mut window = SampleWindow::seeded(1000, NOW).unwrap();
        window.push(Sample::new(NOW + 500, 1.0));
        assert_eq!(window.evict_expired(), 0);

        // Exactly one span after the first seed
        window.push(Sample::new(NOW + 998, 2.0));
        assert_eq!(window.evict_expired(), 1);
        assert_eq!(window.oldest().unwrap().timestamp, NOW - 1);
    }

    #[test]
    fn test_evict_after_long_gap_keeps_newest() {
        let mut window = SampleWindow::seeded(1000, NOW).unwrap();
        window.push(Sample::new(NOW + 60_000, 5.0));

        assert_eq!(window.evict_expired(), 2);
        assert_eq!(window.len(), 1);
        assert_eq!(window.newest().unwrap().value, 5.0);
    }

    #[test]
    fn test_never_retains_expired_samples() {
        let span = 10_000;
        let mut window = SampleWindow::seeded(span, NOW).unwrap();
        let mut t = NOW;

        for i in 0..500 {
            // Irregular spacing, including bursts and gaps
            t += [0, 3, 250, 1_200, 7][i % 5];
            window.push(Sample::new(t, i as f64));
            window.evict_expired();

            let newest = window.newest().unwrap().timestamp;
            assert!(window.iter().all(|s| newest - s.timestamp < span));
            assert!(!window.is_empty());
        }
    }

    #[test]
    fn test_max_value_with_negative_readings() {
        let mut window = SampleWindow::new(DEFAULT_SPAN_MS).unwrap();
        assert_eq!(window.max_value(), None);

        window.push(Sample::new(NOW, -4.0));
        window.push(Sample::new(NOW + 1, -2.5));
        assert_eq!(window.max_value(), Some(-2.5));
    }
}
