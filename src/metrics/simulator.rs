//! Simulator Phase Metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct SimulatorMetrics;

pub fn envelope_published() {
    ::metrics::counter!(phase_metric!(counter, "simulator", "envelopes_published")).increment(1);
}

pub fn publish_failed() {
    ::metrics::counter!(phase_metric!(counter, "simulator", "publish_failures")).increment(1);
}

impl PhaseMetrics for SimulatorMetrics {
    fn register_metrics() {
        use metrics::counter;

        let _ = counter!(phase_metric!(counter, "simulator", "envelopes_published"));
        let _ = counter!(phase_metric!(counter, "simulator", "publish_failures"));
    }

    fn phase_name() -> &'static str {
        "simulator"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "simulator", "envelopes_published"),
                metric_type: MetricType::Counter,
                help: "Simulated readings accepted by the push endpoint",
            },
            MetricDoc {
                name: phase_metric!(counter, "simulator", "publish_failures"),
                metric_type: MetricType::Counter,
                help: "Simulated readings the push endpoint refused or never received",
            },
        ]
    }
}
