//! Trend analyzer — memory-growth slope over a rolling sample window.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

/// Samples kept per container.
const CAPACITY: usize = 10;
/// Minimum samples before a slope is computed.
const MIN_SAMPLES: usize = 3;
/// Minimum span between first and last sample.
const MIN_SPAN_SECS: i64 = 60;
/// Growth faster than this is leak-shaped.
const GROWTH_LIMIT_MB_PER_MIN: f64 = 10.0;
/// Only flag a leak when the container is already using real memory.
const MEMORY_FLOOR_PERCENT: f64 = 50.0;

pub struct TrendTracker {
    history: HashMap<String, VecDeque<(DateTime<Utc>, f64)>>,
}

impl TrendTracker {
    pub fn new() -> Self {
        Self {
            history: HashMap::new(),
        }
    }

    /// Record a sample and return the growth slope in MB/min once enough
    /// history spans a long enough interval.
    pub fn record(&mut self, name: &str, at: DateTime<Utc>, memory_mb: f64) -> Option<f64> {
        let history = self.history.entry(name.to_string()).or_default();
        if history.len() == CAPACITY {
            history.pop_front();
        }
        history.push_back((at, memory_mb));

        if history.len() < MIN_SAMPLES {
            return None;
        }

        let (first_at, first_mb) = *history.front()?;
        let (last_at, last_mb) = *history.back()?;

        let span_secs = (last_at - first_at).num_seconds();
        if span_secs < MIN_SPAN_SECS {
            return None;
        }

        let minutes = span_secs as f64 / 60.0;
        Some((last_mb - first_mb) / minutes)
    }

    /// Leak signal: fast growth on a container already above the memory
    /// floor.
    pub fn leak_suspected(slope_mb_per_min: f64, memory_percent: f64) -> bool {
        slope_mb_per_min > GROWTH_LIMIT_MB_PER_MIN && memory_percent > MEMORY_FLOOR_PERCENT
    }
}

impl Default for TrendTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn steady_growth_is_flagged() {
        let mut tracker = TrendTracker::new();
        // 100 → 120 → 140 MB over two minutes = 20 MB/min
        assert!(tracker.record("leaky", t0(), 100.0).is_none());
        assert!(tracker.record("leaky", t0() + Duration::seconds(60), 120.0).is_none());
        let slope = tracker
            .record("leaky", t0() + Duration::seconds(120), 140.0)
            .unwrap();
        assert!((slope - 20.0).abs() < 1e-9);
        assert!(TrendTracker::leak_suspected(slope, 60.0));
    }

    #[test]
    fn stable_series_is_not_flagged() {
        let mut tracker = TrendTracker::new();
        tracker.record("calm", t0(), 100.0);
        tracker.record("calm", t0() + Duration::seconds(60), 102.0);
        let slope = tracker
            .record("calm", t0() + Duration::seconds(120), 101.0)
            .unwrap();
        assert!(slope < 1.0);
        assert!(!TrendTracker::leak_suspected(slope, 60.0));
    }

    #[test]
    fn growth_below_memory_floor_is_not_flagged() {
        // fast growth, but the container is small: watch, don't page
        assert!(!TrendTracker::leak_suspected(25.0, 30.0));
        assert!(TrendTracker::leak_suspected(25.0, 50.1));
    }

    #[test]
    fn needs_three_samples() {
        let mut tracker = TrendTracker::new();
        assert!(tracker.record("x", t0(), 100.0).is_none());
        assert!(tracker
            .record("x", t0() + Duration::seconds(120), 200.0)
            .is_none());
    }

    #[test]
    fn needs_a_minute_of_span() {
        let mut tracker = TrendTracker::new();
        tracker.record("x", t0(), 100.0);
        tracker.record("x", t0() + Duration::seconds(20), 120.0);
        assert!(tracker
            .record("x", t0() + Duration::seconds(40), 140.0)
            .is_none());
    }

    #[test]
    fn history_is_capped_at_ten_samples() {
        let mut tracker = TrendTracker::new();
        for i in 0..25 {
            tracker.record("x", t0() + Duration::seconds(i * 30), 100.0 + i as f64);
        }
        assert_eq!(tracker.history.get("x").unwrap().len(), 10);

        // the slope is computed over the surviving window only
        let history = tracker.history.get("x").unwrap();
        let (first_at, _) = history.front().unwrap();
        assert_eq!(*first_at, t0() + Duration::seconds(15 * 30));
    }

    #[test]
    fn containers_do_not_share_history() {
        let mut tracker = TrendTracker::new();
        tracker.record("a", t0(), 100.0);
        tracker.record("a", t0() + Duration::seconds(60), 200.0);
        // "b" starts fresh
        assert!(tracker.record("b", t0() + Duration::seconds(120), 500.0).is_none());
    }
}
