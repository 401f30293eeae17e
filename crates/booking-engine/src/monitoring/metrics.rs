use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Pipeline counters
///
/// Plain atomics; reading a snapshot is wait-free and never blocks the
/// workers that bump them.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    processed: AtomicU64,
    confirmed: AtomicU64,
    rejected: AtomicU64,
    errors: AtomicU64,
    manual_reviews: AtomicU64,
    retries: AtomicU64,
    expired: AtomicU64,
    work_items_created: AtomicU64,
    assignments: AtomicU64,
    allocation_failures: AtomicU64,
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub processed: u64,
    pub confirmed: u64,
    pub rejected: u64,
    pub errors: u64,
    pub manual_reviews: u64,
    pub retries: u64,
    pub expired: u64,
    pub work_items_created: u64,
    pub assignments: u64,
    pub allocation_failures: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_confirmed(&self) {
        self.confirmed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_manual_reviews(&self) {
        self.manual_reviews.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_work_items_created(&self) {
        self.work_items_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_assignments(&self) {
        self.assignments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_allocation_failures(&self) {
        self.allocation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            confirmed: self.confirmed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            manual_reviews: self.manual_reviews.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            work_items_created: self.work_items_created.load(Ordering::Relaxed),
            assignments: self.assignments.load(Ordering::Relaxed),
            allocation_failures: self.allocation_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = MetricsCollector::new();
        metrics.incr_processed();
        metrics.incr_processed();
        metrics.incr_confirmed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.processed, 2);
        assert_eq!(snapshot.confirmed, 1);
        assert_eq!(snapshot.rejected, 0);
    }
}
