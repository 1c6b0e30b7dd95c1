use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide ingestion counters
#[derive(Debug, Default)]
pub struct IngestMetrics {
    batches: AtomicU64,
    entries: AtomicU64,
    hue_fallbacks: AtomicU64,
}

/// Point-in-time copy of `IngestMetrics`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub batches: u64,
    pub entries: u64,
    pub hue_fallbacks: u64,
}

impl IngestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one persisted batch of `entries` entries
    pub fn record_batch(&self, entries: usize) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.entries.fetch_add(entries as u64, Ordering::Relaxed);
    }

    /// Record one image whose hue fell back to the default
    pub fn record_hue_fallback(&self) {
        self.hue_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            entries: self.entries.load(Ordering::Relaxed),
            hue_fallbacks: self.hue_fallbacks.load(Ordering::Relaxed),
        }
    }
}
