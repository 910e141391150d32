//! Metrics collection and exposition.
//!
//! # Metrics
//! - `identity_resolutions_total` (counter): resolved identities by source
//! - `rate_limited_total` (counter): rejected requests by identity source
//!
//! Identities themselves are never used as labels.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::identity::IdentitySource;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Count one identity resolution.
pub fn record_identity(source: IdentitySource) {
    metrics::counter!("identity_resolutions_total", "source" => source.as_str()).increment(1);
}

/// Count one request rejected by the rate limiter.
pub fn record_rate_limited(source: IdentitySource) {
    metrics::counter!("rate_limited_total", "source" => source.as_str()).increment(1);
}
