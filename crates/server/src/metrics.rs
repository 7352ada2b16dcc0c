//! Aggregate shaping metrics.
//!
//! Counters are atomics updated from concurrently in-flight requests;
//! `snapshot()` folds them into the serializable shape served by the
//! `/metrics` endpoint. `oversized_event_count` tracks hits on the raw
//! truncation backstop and should stay at ~0 in a correctly configured
//! deployment; a non-zero value means a field-set registration is
//! missing or a hard cap is set below the envelope floor.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Thread-safe shaping counters.
#[derive(Debug, Default)]
pub struct ShapeMetrics {
    total_requests: AtomicU64,
    list_requests: AtomicU64,
    cursor_requests: AtomicU64,
    summarized_responses: AtomicU64,
    oversized_events: AtomicU64,
    response_bytes_total: AtomicU64,
    latency_micros_total: AtomicU64,
}

impl ShapeMetrics {
    /// Create shared metrics.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record a completed request through the shaping layer.
    pub fn record_request(&self, latency: Duration, response_bytes: usize) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.latency_micros_total
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
        self.response_bytes_total
            .fetch_add(response_bytes as u64, Ordering::Relaxed);
    }

    /// Record a list-endpoint call and whether it supplied a cursor.
    pub fn record_list_request(&self, with_cursor: bool) {
        self.list_requests.fetch_add(1, Ordering::Relaxed);
        if with_cursor {
            self.cursor_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a response replaced by a preview envelope.
    pub fn record_summarized(&self) {
        self.summarized_responses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a hit on the raw truncation backstop.
    pub fn record_oversized(&self) {
        self.oversized_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold the counters into a serializable snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let lists = self.list_requests.load(Ordering::Relaxed);
        let cursors = self.cursor_requests.load(Ordering::Relaxed);
        let summarized = self.summarized_responses.load(Ordering::Relaxed);
        let bytes = self.response_bytes_total.load(Ordering::Relaxed);
        let micros = self.latency_micros_total.load(Ordering::Relaxed);

        let rate = |num: u64, den: u64| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        MetricsSnapshot {
            total_requests: total,
            pagination_adoption_rate: rate(cursors, lists),
            summarization_adoption_rate: rate(summarized, total),
            avg_response_size_bytes: rate(bytes, total),
            avg_latency_ms: rate(micros, total) / 1000.0,
            oversized_event_count: self.oversized_events.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Requests seen by the shaping layer.
    pub total_requests: u64,
    /// Fraction of list-endpoint calls that supplied a cursor.
    pub pagination_adoption_rate: f64,
    /// Fraction of responses replaced by a preview envelope.
    pub summarization_adoption_rate: f64,
    /// Mean response body size in bytes.
    pub avg_response_size_bytes: f64,
    /// Mean shaping-layer latency in milliseconds.
    pub avg_latency_ms: f64,
    /// Times the raw truncation backstop fired.
    pub oversized_event_count: u64,
}
