//! Tracing setup and in-process counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Fails only when a subscriber is already installed
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    updates_received: AtomicU64,
    batches_processed: AtomicU64,
    links_resolved: AtomicU64,
    resolve_failures: AtomicU64,
    downloads_failed: AtomicU64,
    deliveries: AtomicU64,
    delivery_failures: AtomicU64,
    archive_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(counter: &AtomicU64, name: &'static str) {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = name, "Metric incremented");
    }

    pub fn update_received(&self) {
        Self::bump(&self.updates_received, "updates_received");
    }

    pub fn batch_processed(&self) {
        Self::bump(&self.batches_processed, "batches_processed");
    }

    pub fn link_resolved(&self) {
        Self::bump(&self.links_resolved, "links_resolved");
    }

    pub fn resolve_failed(&self) {
        Self::bump(&self.resolve_failures, "resolve_failures");
    }

    pub fn download_failed(&self) {
        Self::bump(&self.downloads_failed, "downloads_failed");
    }

    pub fn delivered(&self) {
        Self::bump(&self.deliveries, "deliveries");
    }

    pub fn delivery_failed(&self) {
        Self::bump(&self.delivery_failures, "delivery_failures");
    }

    pub fn archive_failed(&self) {
        Self::bump(&self.archive_failures, "archive_failures");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            updates_received: self.updates_received.load(Ordering::Relaxed),
            batches_processed: self.batches_processed.load(Ordering::Relaxed),
            links_resolved: self.links_resolved.load(Ordering::Relaxed),
            resolve_failures: self.resolve_failures.load(Ordering::Relaxed),
            downloads_failed: self.downloads_failed.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            archive_failures: self.archive_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub updates_received: u64,
    pub batches_processed: u64,
    pub links_resolved: u64,
    pub resolve_failures: u64,
    pub downloads_failed: u64,
    pub deliveries: u64,
    pub delivery_failures: u64,
    pub archive_failures: u64,
}
