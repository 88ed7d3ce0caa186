use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity.
#[derive(Default)]
pub struct IngestMetrics {
    uploads_succeeded: AtomicU64,
    uploads_failed: AtomicU64,
    batches_submitted: AtomicU64,
    polls_issued: AtomicU64,
    documents_terminal: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a single-file upload that the service accepted.
    pub fn record_upload_succeeded(&self) {
        self.uploads_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a single-file upload that ended in an error state.
    pub fn record_upload_failed(&self) {
        self.uploads_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an accepted batch submission.
    pub fn record_batch_submitted(&self) {
        self.batches_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one status poll issued against the service.
    pub fn record_poll(&self) {
        self.polls_issued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a tracked document reaching a terminal status.
    pub fn record_terminal(&self) {
        self.documents_terminal.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uploads_succeeded: self.uploads_succeeded.load(Ordering::Relaxed),
            uploads_failed: self.uploads_failed.load(Ordering::Relaxed),
            batches_submitted: self.batches_submitted.load(Ordering::Relaxed),
            polls_issued: self.polls_issued.load(Ordering::Relaxed),
            documents_terminal: self.documents_terminal.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Uploads the service accepted since startup.
    pub uploads_succeeded: u64,
    /// Uploads that ended in an error state since startup.
    pub uploads_failed: u64,
    /// Batch submissions the service accepted since startup.
    pub batches_submitted: u64,
    /// Status polls issued since startup.
    pub polls_issued: u64,
    /// Tracked documents observed reaching a terminal status.
    pub documents_terminal: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_uploads_and_polls() {
        let metrics = IngestMetrics::new();
        metrics.record_upload_succeeded();
        metrics.record_upload_succeeded();
        metrics.record_upload_failed();
        metrics.record_poll();
        metrics.record_poll();
        metrics.record_poll();
        metrics.record_terminal();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.uploads_succeeded, 2);
        assert_eq!(snapshot.uploads_failed, 1);
        assert_eq!(snapshot.polls_issued, 3);
        assert_eq!(snapshot.documents_terminal, 1);
    }

    #[test]
    fn snapshot_starts_empty() {
        let metrics = IngestMetrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.uploads_succeeded, 0);
        assert_eq!(snapshot.uploads_failed, 0);
        assert_eq!(snapshot.batches_submitted, 0);
        assert_eq!(snapshot.polls_issued, 0);
        assert_eq!(snapshot.documents_terminal, 0);
    }
}
