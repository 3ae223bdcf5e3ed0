use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    rows_fetched: AtomicU64,
    rows_delivered: AtomicU64,
    bytes_delivered: AtomicU64,
    fetch_runs: AtomicU64,
    drains: AtomicU64,
    fetch_errors: AtomicU64,
}

/// Counters of a streaming session, shared between its tasks.
#[derive(Debug, Clone)]
pub struct StreamMetrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamMetricsSnapshot {
    pub rows_fetched: u64,
    pub rows_delivered: u64,
    pub bytes_delivered: u64,
    pub fetch_runs: u64,
    pub drains: u64,
    pub fetch_errors: u64,
}

impl StreamMetrics {
    pub fn new() -> Self {
        StreamMetrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_fetched(&self, count: u64) {
        self.inner.rows_fetched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_delivered(&self, rows: u64, bytes: u64) {
        self.inner.rows_delivered.fetch_add(rows, Ordering::Relaxed);
        self.inner.bytes_delivered.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_runs(&self) -> u64 {
        self.inner.fetch_runs.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn increment_drains(&self) {
        self.inner.drains.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_fetch_errors(&self) {
        self.inner.fetch_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StreamMetricsSnapshot {
        StreamMetricsSnapshot {
            rows_fetched: self.inner.rows_fetched.load(Ordering::Relaxed),
            rows_delivered: self.inner.rows_delivered.load(Ordering::Relaxed),
            bytes_delivered: self.inner.bytes_delivered.load(Ordering::Relaxed),
            fetch_runs: self.inner.fetch_runs.load(Ordering::Relaxed),
            drains: self.inner.drains.load(Ordering::Relaxed),
            fetch_errors: self.inner.fetch_errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self::new()
    }
}
