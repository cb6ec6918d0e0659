//! Simple metrics module for the event search service
//!
//! Metric names live in one enum so the strings are never repeated; each
//! pipeline stage gets a small submodule of recording functions.

use std::fmt;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Upstream search
    UpstreamRequests,
    UpstreamFallbacks,

    // Cache
    CacheHits,
    CacheMisses,
    CacheEvictions,

    // Enrichment
    EnrichSummarized,
    EnrichFallback,
    EnrichCarriedOver,

    // Requests
    RequestsTotal,
    RequestDuration,
    RequestItems,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::UpstreamRequests => "events_upstream_requests_total",
            MetricName::UpstreamFallbacks => "events_upstream_fallbacks_total",

            MetricName::CacheHits => "events_cache_hits_total",
            MetricName::CacheMisses => "events_cache_misses_total",
            MetricName::CacheEvictions => "events_cache_evictions_total",

            MetricName::EnrichSummarized => "events_enrich_summarized_total",
            MetricName::EnrichFallback => "events_enrich_fallback_total",
            MetricName::EnrichCarriedOver => "events_enrich_carried_over_total",

            MetricName::RequestsTotal => "events_requests_total",
            MetricName::RequestDuration => "events_request_duration_seconds",
            MetricName::RequestItems => "events_request_items",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder. Idempotent; later calls are no-ops.
pub fn init() {
    if HANDLE.get().is_some() {
        return;
    }
    match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_ok() {
                info!("Prometheus recorder installed");
            }
        }
        Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
    }
}

/// Renders the current metrics in Prometheus text format, if a recorder is installed.
pub fn render() -> Option<String> {
    HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Upstream Metrics
// ============================================================================

pub mod upstream {
    use super::MetricName;

    /// Record one upstream call with its filter mode and outcome
    pub fn request(mode: &'static str, outcome: &'static str) {
        ::metrics::counter!(MetricName::UpstreamRequests.as_str(), "mode" => mode, "outcome" => outcome)
            .increment(1);
    }

    /// Record that a query settled on a relaxed mode
    pub fn fallback(mode: &'static str) {
        ::metrics::counter!(MetricName::UpstreamFallbacks.as_str(), "mode" => mode).increment(1);
    }
}

// ============================================================================
// Cache Metrics
// ============================================================================

pub mod cache {
    use super::MetricName;

    pub fn hit() {
        ::metrics::counter!(MetricName::CacheHits.as_str()).increment(1);
    }

    pub fn miss() {
        ::metrics::counter!(MetricName::CacheMisses.as_str()).increment(1);
    }

    pub fn evicted(reason: &'static str, count: usize) {
        ::metrics::counter!(MetricName::CacheEvictions.as_str(), "reason" => reason)
            .increment(count as u64);
    }
}

// ============================================================================
// Enrichment Metrics
// ============================================================================

pub mod enrich {
    use super::MetricName;

    pub fn summarized(count: usize) {
        ::metrics::counter!(MetricName::EnrichSummarized.as_str()).increment(count as u64);
    }

    pub fn fallback(count: usize) {
        ::metrics::counter!(MetricName::EnrichFallback.as_str()).increment(count as u64);
    }

    pub fn carried_over(count: usize) {
        ::metrics::counter!(MetricName::EnrichCarriedOver.as_str()).increment(count as u64);
    }
}

// ============================================================================
// Request Metrics
// ============================================================================

pub mod request {
    use super::MetricName;

    pub fn completed(status: &'static str, secs: f64, items: usize) {
        ::metrics::counter!(MetricName::RequestsTotal.as_str(), "status" => status).increment(1);
        ::metrics::histogram!(MetricName::RequestDuration.as_str()).record(secs);
        ::metrics::histogram!(MetricName::RequestItems.as_str()).record(items as f64);
    }
}
