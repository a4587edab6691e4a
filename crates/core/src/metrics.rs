use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
pub struct Metrics {
    requests_received: AtomicU64,
    requests_accepted: AtomicU64,
    requests_ignored: AtomicU64,
    generation_failures: AtomicU64,
    repeats: AtomicU64,
    undos: AtomicU64,
    force_undos: AtomicU64,
    force_undo_failures: AtomicU64,
    polls_delivered: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_requests_received(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_requests_accepted(&self) {
        self.requests_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_requests_ignored(&self) {
        self.requests_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_generation_failures(&self) {
        self.generation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_repeats(&self) {
        self.repeats.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_undos(&self) {
        self.undos.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_force_undos(&self) {
        self.force_undos.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_force_undo_failures(&self) {
        self.force_undo_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_polls_delivered(&self) {
        self.polls_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_received: self.requests_received.load(Ordering::Relaxed),
            requests_accepted: self.requests_accepted.load(Ordering::Relaxed),
            requests_ignored: self.requests_ignored.load(Ordering::Relaxed),
            generation_failures: self.generation_failures.load(Ordering::Relaxed),
            repeats: self.repeats.load(Ordering::Relaxed),
            undos: self.undos.load(Ordering::Relaxed),
            force_undos: self.force_undos.load(Ordering::Relaxed),
            force_undo_failures: self.force_undo_failures.load(Ordering::Relaxed),
            polls_delivered: self.polls_delivered.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests_received: u64,
    pub requests_accepted: u64,
    pub requests_ignored: u64,
    pub generation_failures: u64,
    pub repeats: u64,
    pub undos: u64,
    pub force_undos: u64,
    pub force_undo_failures: u64,
    pub polls_delivered: u64,
}

impl MetricsSnapshot {
    /// Share of decided requests that were accepted.
    pub fn acceptance_rate(&self) -> f64 {
        let decided = self.requests_accepted + self.requests_ignored;
        if decided == 0 {
            return 1.0;
        }
        self.requests_accepted as f64 / decided as f64
    }

    pub fn generation_success_rate(&self) -> f64 {
        if self.requests_accepted == 0 {
            return 1.0;
        }
        1.0 - (self.generation_failures as f64 / self.requests_accepted as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_without_traffic() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot.acceptance_rate(), 1.0);
        assert_eq!(snapshot.generation_success_rate(), 1.0);
    }

    #[test]
    fn test_rates_after_traffic() {
        let metrics = Metrics::new();
        for _ in 0..3 {
            metrics.inc_requests_received();
            metrics.inc_requests_accepted();
        }
        metrics.inc_requests_received();
        metrics.inc_requests_ignored();
        metrics.inc_generation_failures();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_received, 4);
        assert_eq!(snapshot.acceptance_rate(), 0.75);
        assert!((snapshot.generation_success_rate() - 2.0 / 3.0).abs() < 1e-9);
    }
}
