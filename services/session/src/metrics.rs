//! Prometheus metrics for the session service.

use once_cell::sync::Lazy;
use prometheus::{CounterVec, Encoder, HistogramVec, TextEncoder, register_counter_vec, register_histogram_vec};

/// Token pairs issued, by origin (`login` or `rotation`).
pub static PAIRS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_service_pairs_issued_total",
        "Total number of token pairs issued",
        &["origin"]
    )
    .expect("Failed to register pairs_issued metric")
});

/// Rotation attempts by outcome.
pub static ROTATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_service_rotations_total",
        "Total number of rotation attempts",
        &["outcome"]
    )
    .expect("Failed to register rotations metric")
});

/// Rotation latency histogram.
pub static ROTATION_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "session_service_rotation_latency_seconds",
        "Rotation latency in seconds",
        &["outcome"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register rotation_latency metric")
});

/// Security events counter.
pub static SECURITY_EVENTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_service_security_events_total",
        "Total number of security events",
        &["event_type"]
    )
    .expect("Failed to register security_events metric")
});

/// Record an issued pair.
pub fn record_pair_issued(origin: &str) {
    PAIRS_ISSUED.with_label_values(&[origin]).inc();
}

/// Record a rotation attempt and its latency.
pub fn record_rotation(outcome: &str, duration_secs: f64) {
    ROTATIONS.with_label_values(&[outcome]).inc();
    ROTATION_LATENCY.with_label_values(&[outcome]).observe(duration_secs);
}

/// Record a security event.
pub fn record_security_event(event_type: &str) {
    SECURITY_EVENTS.with_label_values(&[event_type]).inc();
}

/// Render the default registry in the Prometheus text format.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
