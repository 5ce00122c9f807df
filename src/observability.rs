use std::net::SocketAddr;
use std::time::Instant;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: availability queries answered. Labels: kind.
pub const QUERIES_TOTAL: &str = "slotwise_queries_total";

/// Histogram: availability query latency in seconds. Labels: kind.
pub const QUERY_DURATION_SECONDS: &str = "slotwise_query_duration_seconds";

/// Counter: bookings accepted by the ledger.
pub const BOOKINGS_CREATED_TOTAL: &str = "slotwise_bookings_created_total";

/// Counter: bookings or reactivations rejected for overlapping an existing booking.
pub const BOOKING_CONFLICTS_TOTAL: &str = "slotwise_booking_conflicts_total";

/// Counter: status transitions. Labels: status (the new one).
pub const BOOKING_STATUS_CHANGES_TOTAL: &str = "slotwise_booking_status_changes_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: dates with a ledger bucket.
pub const DAYS_ACTIVE: &str = "slotwise_days_active";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics"),
        Err(e) => tracing::error!("failed to install Prometheus metrics exporter: {e}"),
    }
}

/// Install a `fmt` subscriber. Safe to call twice.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().try_init();
}

pub(crate) fn record_query(kind: &'static str, started: Instant) {
    metrics::counter!(QUERIES_TOTAL, "kind" => kind).increment(1);
    metrics::histogram!(QUERY_DURATION_SECONDS, "kind" => kind)
        .record(started.elapsed().as_secs_f64());
}
