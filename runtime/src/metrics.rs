//! Prometheus metrics for the booking service.
//!
//! The core and runtime crates record through the `metrics` facade; this
//! module installs the Prometheus recorder and describes every series.
//!
//! # Example
//!
//! ```rust,no_run
//! use courtside_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! let body = server.render();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Owns the Prometheus recorder for the process.
///
/// The HTTP listener itself lives in the server binary; this type only
/// installs the recorder and renders the scrape body.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a metrics server that will listen on `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address the scrape endpoint should bind to.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Describe all series and install the global recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter cannot be built or a
    /// different recorder is already installed.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let handle = builder
            .install_recorder()
            .map_err(|e| MetricsError::Install(e.to_string()))?;
        self.handle = Some(handle);

        register_metrics();
        tracing::info!(addr = %self.addr, "Metrics recorder installed");
        Ok(())
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if [`MetricsServer::start`] has not succeeded.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Describe every series the service records.
pub fn register_metrics() {
    describe_counter!(
        "courtside_bookings_total",
        "Booking attempts by outcome (created, slot_conflict, validation, ...)"
    );
    describe_histogram!(
        "courtside_booking_duration_seconds",
        "Time taken to process a booking request"
    );
    describe_counter!(
        "courtside_payments_settled_total",
        "Payments moved to settled by a provider callback"
    );
    describe_counter!(
        "courtside_notifications_total",
        "Outbox delivery attempts by kind and outcome"
    );
    describe_histogram!(
        "courtside_outbox_batch_duration_seconds",
        "Time taken to process one outbox batch"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unstarted_server_renders_nothing() {
        let server = MetricsServer::new(SocketAddr::from(([127, 0, 0, 1], 0)));
        assert!(server.handle().is_none());
        assert!(server.render().is_none());
    }

    #[test]
    fn describing_without_a_recorder_is_harmless() {
        register_metrics();
    }
}
