//! Prometheus metrics for the relay pipeline.

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, Encoder, Histogram, IntCounter, TextEncoder,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "apns_relay";

lazy_static! {
    /// Notifications delivered to APNs with a 200 response
    pub static ref DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_delivered_total", METRIC_PREFIX),
        "Notifications accepted by APNs"
    ).unwrap();

    /// Messages skipped because they exceeded the staleness threshold
    pub static ref STALE_SKIPPED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_stale_skipped_total", METRIC_PREFIX),
        "Messages discarded as too stale to deliver"
    ).unwrap();

    /// Messages whose payload could not be decoded
    pub static ref DECODE_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_decode_failures_total", METRIC_PREFIX),
        "Messages dropped due to undecodable payloads or missing attributes"
    ).unwrap();

    /// Sends that failed at the transport level or with a non-200 status
    pub static ref SEND_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_send_failures_total", METRIC_PREFIX),
        "Dispatches that failed (transport or HTTP status)"
    ).unwrap();

    /// Outbound send latency in seconds
    pub static ref SEND_DURATION_SECONDS: Histogram = register_histogram!(
        format!("{}_send_duration_seconds", METRIC_PREFIX),
        "Latency of the outbound APNs call",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();
}

/// Encode all registered metrics in the Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increment() {
        let before = DELIVERED_TOTAL.get();
        DELIVERED_TOTAL.inc();
        assert_eq!(DELIVERED_TOTAL.get(), before + 1);
    }

    #[test]
    fn test_encode_metrics() {
        DELIVERED_TOTAL.inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("apns_relay_delivered_total"));
    }
}
