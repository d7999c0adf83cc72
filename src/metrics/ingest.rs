//! Ingest Phase Metrics
//!
//! Counters for every transition of a pipeline run: decoding, classification,
//! the analytical write, the archive write and the final ack/redeliver verdict.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct IngestMetrics;

pub fn envelope_received() {
    ::metrics::counter!(phase_metric!(counter, "ingest", "envelopes_received")).increment(1);
}

pub fn decode_failed() {
    ::metrics::counter!(phase_metric!(counter, "ingest", "decode_failures")).increment(1);
}

pub fn anomaly_detected() {
    ::metrics::counter!(phase_metric!(counter, "ingest", "anomalies")).increment(1);
}

pub fn analytics_inserted() {
    ::metrics::counter!(phase_metric!(counter, "ingest", "analytics_rows_inserted")).increment(1);
}

pub fn analytics_rows_rejected(rows: usize) {
    ::metrics::counter!(phase_metric!(counter, "ingest", "analytics_rows_rejected"))
        .increment(rows as u64);
}

pub fn analytics_transport_fault() {
    ::metrics::counter!(phase_metric!(counter, "ingest", "analytics_transport_faults")).increment(1);
}

pub fn archive_written() {
    ::metrics::counter!(phase_metric!(counter, "ingest", "archive_writes")).increment(1);
}

pub fn archive_fault() {
    ::metrics::counter!(phase_metric!(counter, "ingest", "archive_faults")).increment(1);
}

pub fn acknowledged() {
    ::metrics::counter!(phase_metric!(counter, "ingest", "acknowledged")).increment(1);
}

pub fn redelivery_requested() {
    ::metrics::counter!(phase_metric!(counter, "ingest", "redeliveries_requested")).increment(1);
}

pub fn pipeline_duration(secs: f64) {
    ::metrics::histogram!(phase_metric!(histogram, "ingest", "duration_seconds")).record(secs);
}

impl PhaseMetrics for IngestMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "ingest", "envelopes_received"));
        let _ = counter!(phase_metric!(counter, "ingest", "decode_failures"));
        let _ = counter!(phase_metric!(counter, "ingest", "anomalies"));
        let _ = counter!(phase_metric!(counter, "ingest", "analytics_rows_inserted"));
        let _ = counter!(phase_metric!(counter, "ingest", "analytics_rows_rejected"));
        let _ = counter!(phase_metric!(counter, "ingest", "analytics_transport_faults"));
        let _ = counter!(phase_metric!(counter, "ingest", "archive_writes"));
        let _ = counter!(phase_metric!(counter, "ingest", "archive_faults"));
        let _ = counter!(phase_metric!(counter, "ingest", "acknowledged"));
        let _ = counter!(phase_metric!(counter, "ingest", "redeliveries_requested"));
        let _ = histogram!(phase_metric!(histogram, "ingest", "duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "ingest"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "ingest", "envelopes_received"),
                metric_type: MetricType::Counter,
                help: "Delivery envelopes handed to the pipeline",
            },
            MetricDoc {
                name: phase_metric!(counter, "ingest", "decode_failures"),
                metric_type: MetricType::Counter,
                help: "Envelopes that failed base64/UTF-8/JSON decoding",
            },
            MetricDoc {
                name: phase_metric!(counter, "ingest", "anomalies"),
                metric_type: MetricType::Counter,
                help: "Events classified as anomalous",
            },
            MetricDoc {
                name: phase_metric!(counter, "ingest", "analytics_rows_inserted"),
                metric_type: MetricType::Counter,
                help: "Rows accepted by the analytical store",
            },
            MetricDoc {
                name: phase_metric!(counter, "ingest", "analytics_rows_rejected"),
                metric_type: MetricType::Counter,
                help: "Rows rejected by the analytical store (not redelivered)",
            },
            MetricDoc {
                name: phase_metric!(counter, "ingest", "analytics_transport_faults"),
                metric_type: MetricType::Counter,
                help: "Analytical store calls that failed at the transport level",
            },
            MetricDoc {
                name: phase_metric!(counter, "ingest", "archive_writes"),
                metric_type: MetricType::Counter,
                help: "Event blobs written to the archive store",
            },
            MetricDoc {
                name: phase_metric!(counter, "ingest", "archive_faults"),
                metric_type: MetricType::Counter,
                help: "Archive writes that failed",
            },
            MetricDoc {
                name: phase_metric!(counter, "ingest", "acknowledged"),
                metric_type: MetricType::Counter,
                help: "Pipeline runs that ended in acknowledgement",
            },
            MetricDoc {
                name: phase_metric!(counter, "ingest", "redeliveries_requested"),
                metric_type: MetricType::Counter,
                help: "Pipeline runs that ended in a redelivery request",
            },
            MetricDoc {
                name: phase_metric!(histogram, "ingest", "duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Wall time of one pipeline run",
            },
        ]
    }
}
