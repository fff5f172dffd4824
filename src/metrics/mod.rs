//! Prometheus metrics for the chronod coordinator
//!
//! Call `init_metrics()` at coordinator startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{register_counter, register_gauge, Counter, Encoder, Gauge, TextEncoder};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all coordinator metrics
struct CoordinatorMetrics {
    registered_instances: Gauge,
    sync_rounds_total: Counter,
    sync_round_failures_total: Counter,
    poll_failures_total: Counter,
    corrections_pushed_total: Counter,
}

/// Global storage for coordinator metrics
static COORDINATOR_METRICS: OnceLock<CoordinatorMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at coordinator startup. If metric
/// registration fails, errors are logged and subsequent metric operations
/// become no-ops.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let coordinator = CoordinatorMetrics {
        registered_instances: register_gauge!(
            "chronod_coordinator_registered_instances",
            "Number of registered time node entries (duplicates counted)"
        )?,
        sync_rounds_total: register_counter!(
            "chronod_coordinator_sync_rounds_total",
            "Total synchronization rounds triggered"
        )?,
        sync_round_failures_total: register_counter!(
            "chronod_coordinator_sync_round_failures_total",
            "Synchronization rounds aborted before any correction was pushed"
        )?,
        poll_failures_total: register_counter!(
            "chronod_coordinator_poll_failures_total",
            "Per-instance clock polls that failed"
        )?,
        corrections_pushed_total: register_counter!(
            "chronod_coordinator_corrections_pushed_total",
            "Corrections successfully pushed to nodes"
        )?,
    };

    COORDINATOR_METRICS.set(coordinator).ok();
    Ok(())
}

// ============================================================================
// Recording Helpers
// ============================================================================

/// Update the registered instance gauge
pub fn set_registered_instances(count: usize) {
    if let Some(metrics) = COORDINATOR_METRICS.get() {
        metrics.registered_instances.set(count as f64);
    }
}

/// Count a triggered synchronization round
pub fn inc_sync_rounds() {
    if let Some(metrics) = COORDINATOR_METRICS.get() {
        metrics.sync_rounds_total.inc();
    }
}

/// Count a round aborted before corrections
pub fn inc_sync_round_failures() {
    if let Some(metrics) = COORDINATOR_METRICS.get() {
        metrics.sync_round_failures_total.inc();
    }
}

/// Count a failed per-instance poll
pub fn inc_poll_failures() {
    if let Some(metrics) = COORDINATOR_METRICS.get() {
        metrics.poll_failures_total.inc();
    }
}

/// Count corrections pushed in a completed round
pub fn inc_corrections_pushed(count: u64) {
    if let Some(metrics) = COORDINATOR_METRICS.get() {
        metrics.corrections_pushed_total.inc_by(count as f64);
    }
}

// ============================================================================
// Exposition
// ============================================================================

/// Render all registered metrics in the Prometheus text format
pub fn render() -> String {
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {e}");
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================
