//! Metrics for the ingestion service
//!
//! Each phase owns a submodule that records through the `metrics` facade and
//! documents what it emits. The Prometheus exporter is only installed when a
//! listen address is configured; without it the macros are no-ops.

pub mod ingest;
pub mod simulator;

pub use ingest::IngestMetrics;
pub use simulator::SimulatorMetrics;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Once;
use tracing::{info, warn};

static INIT: Once = Once::new();

/// Install the Prometheus recorder with an HTTP listener. Idempotent.
pub fn init_metrics(listen_addr: SocketAddr) {
    INIT.call_once(|| {
        let builder =
            metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(listen_addr);
        match builder.install() {
            Ok(()) => {
                info!("Prometheus exporter listening on http://{}/metrics", listen_addr);
                register_all_metrics();
            }
            Err(e) => {
                warn!("Failed to install Prometheus exporter: {}", e);
            }
        }
    });
}

/// Trait for phase-specific metrics collections
pub trait PhaseMetrics {
    /// Pre-register every metric so it shows up before the first event
    fn register_metrics();

    fn phase_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

/// Documentation for a single metric
#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricType {
    Counter,
    Histogram,
}

/// Builds `sensor_ingest_{phase}_{name}[_total]`
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("sensor_ingest_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("sensor_ingest_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;

/// Register all phases and warn on name collisions
pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();
    register_phase_metrics::<IngestMetrics>(&mut all_metrics);
    register_phase_metrics::<SimulatorMetrics>(&mut all_metrics);
    info!("Registered {} metrics", all_metrics.len());
}

fn register_phase_metrics<T: PhaseMetrics>(all_metrics: &mut HashMap<&'static str, MetricDoc>) {
    T::register_metrics();
    for doc in T::metrics_documentation() {
        if all_metrics.contains_key(doc.name) {
            warn!(
                "Metric name conflict detected: '{}' in phase '{}'",
                doc.name,
                T::phase_name()
            );
        } else {
            all_metrics.insert(doc.name, doc);
        }
    }
}
