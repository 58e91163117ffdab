//! # Rolling Statistical Window
//!
//! Time-bucketed outcome counters used by the circuit breaker to compute the
//! recent error rate. The window is divided into fixed-length buckets; counts
//! older than the window are discarded as the bucket ring rotates.

use std::time::{Duration, Instant};

/// Terminal outcome of a single command execution, as recorded in the window.
///
/// Short-circuited and bad-request executions are deliberately absent: they
/// never reach the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    Timeout,
    Rejected,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    success: u64,
    failure: u64,
    timeout: u64,
    rejected: u64,
}

impl Bucket {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.success += 1,
            Outcome::Failure => self.failure += 1,
            Outcome::Timeout => self.timeout += 1,
            Outcome::Rejected => self.rejected += 1,
        }
    }
}

/// Aggregated counts over the live portion of the window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounts {
    pub success: u64,
    pub failure: u64,
    pub timeout: u64,
    pub rejected: u64,
}

impl WindowCounts {
    /// Total requests observed in the window
    pub fn total(&self) -> u64 {
        self.success + self.failure + self.timeout + self.rejected
    }

    /// Requests counted as errors: failures, timeouts, and pool rejections
    pub fn error_count(&self) -> u64 {
        self.failure + self.timeout + self.rejected
    }

    /// Error percentage over the window, 0.0 when the window is empty
    pub fn error_percentage(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.error_count() as f64 / total as f64 * 100.0
    }
}

/// Fixed-size ring of time buckets.
///
/// Callers are expected to hold a lock around `record` and `counts`; the
/// window itself performs no synchronization.
#[derive(Debug)]
pub struct RollingWindow {
    buckets: Vec<Bucket>,
    bucket_len: Duration,
    /// Index of the bucket currently being written
    cursor: usize,
    /// Start instant of the cursor bucket
    cursor_started: Instant,
}

impl RollingWindow {
    pub fn new(window: Duration, bucket_count: usize) -> Self {
        let bucket_count = bucket_count.max(1);
        Self {
            buckets: vec![Bucket::default(); bucket_count],
            bucket_len: window / bucket_count as u32,
            cursor: 0,
            cursor_started: Instant::now(),
        }
    }

    /// Record one outcome at instant `now`
    pub fn record(&mut self, outcome: Outcome, now: Instant) {
        self.rotate(now);
        self.buckets[self.cursor].record(outcome);
    }

    /// Aggregate counts across the live buckets at instant `now`
    pub fn counts(&mut self, now: Instant) -> WindowCounts {
        self.rotate(now);
        let mut counts = WindowCounts::default();
        for bucket in &self.buckets {
            counts.success += bucket.success;
            counts.failure += bucket.failure;
            counts.timeout += bucket.timeout;
            counts.rejected += bucket.rejected;
        }
        counts
    }

    /// Discard all counts and restart the window
    pub fn reset(&mut self, now: Instant) {
        for bucket in &mut self.buckets {
            *bucket = Bucket::default();
        }
        self.cursor = 0;
        self.cursor_started = now;
    }

    /// Advance the cursor, zeroing every bucket that has expired since the
    /// last call. Advancing more than a full ring clears the whole window.
    fn rotate(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.cursor_started);
        if elapsed < self.bucket_len {
            return;
        }

        let steps = (elapsed.as_nanos() / self.bucket_len.as_nanos().max(1)) as usize;
        if steps >= self.buckets.len() {
            self.reset(now);
            return;
        }

        for _ in 0..steps {
            self.cursor = (self.cursor + 1) % self.buckets.len();
            self.buckets[self.cursor] = Bucket::default();
        }
        self.cursor_started += self.bucket_len * steps as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_accumulate_within_window() {
        let mut window = RollingWindow::new(Duration::from_secs(10), 10);
        let now = Instant::now();

        window.record(Outcome::Success, now);
        window.record(Outcome::Failure, now);
        window.record(Outcome::Timeout, now);
        window.record(Outcome::Rejected, now);

        let counts = window.counts(now);
        assert_eq!(counts.total(), 4);
        assert_eq!(counts.error_count(), 3);
        assert_eq!(counts.error_percentage(), 75.0);
    }

    #[test]
    fn test_old_buckets_expire() {
        let mut window = RollingWindow::new(Duration::from_millis(100), 10);
        let start = Instant::now();

        window.record(Outcome::Failure, start);
        assert_eq!(window.counts(start).failure, 1);

        // Past the full window, everything is discarded
        let later = start + Duration::from_millis(150);
        assert_eq!(window.counts(later).total(), 0);
    }

    #[test]
    fn test_partial_rotation_keeps_recent_counts() {
        let mut window = RollingWindow::new(Duration::from_millis(100), 10);
        let start = Instant::now();

        window.record(Outcome::Failure, start);
        // Three buckets later the first count is still live
        let later = start + Duration::from_millis(30);
        window.record(Outcome::Success, later);

        let counts = window.counts(later);
        assert_eq!(counts.failure, 1);
        assert_eq!(counts.success, 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut window = RollingWindow::new(Duration::from_secs(10), 10);
        let now = Instant::now();

        window.record(Outcome::Failure, now);
        window.reset(now);
        assert_eq!(window.counts(now).total(), 0);
    }

    #[test]
    fn test_empty_window_has_zero_error_percentage() {
        let mut window = RollingWindow::new(Duration::from_secs(10), 10);
        assert_eq!(window.counts(Instant::now()).error_percentage(), 0.0);
    }
}
