use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, instrument, warn};

use crate::app::ports::{AnalyticsOutcome, AnalyticsSinkPort, ArchiveSinkPort, RowError};
use crate::domain::ArchiveKey;
use crate::envelope::{DeliveryEnvelope, PushRequest};
use crate::error::{IngestError, Result};
use crate::metrics::ingest as ingest_metrics;
use crate::pipeline::{classify, decode};

/// How the analytical write ended for an acknowledged envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsStatus {
    Inserted,
    /// The store refused the row; the event survives only in the archive.
    Rejected(Vec<RowError>),
}

/// Summary of a pipeline run that ended in acknowledgement.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub sensor_id: String,
    pub region: String,
    pub anomaly: bool,
    pub archive_key: ArchiveKey,
    pub analytics: AnalyticsStatus,
}

/// Decodes, classifies and dual-writes one delivery envelope.
///
/// `Ok` means acknowledge, `Err` means the platform must redeliver. Row
/// rejections from the analytical store are logged and do not fail the run;
/// transport faults from either store do. The archive write always follows
/// the analytical attempt, never runs concurrently with it, and there are no
/// internal retries.
pub struct IngestUseCase {
    analytics: Arc<dyn AnalyticsSinkPort>,
    archive: Arc<dyn ArchiveSinkPort>,
}

impl IngestUseCase {
    pub fn new(analytics: Arc<dyn AnalyticsSinkPort>, archive: Arc<dyn ArchiveSinkPort>) -> Self {
        Self { analytics, archive }
    }

    /// Entry point for a raw push-request body (HTTP push or a file).
    pub async fn handle_push(&self, body: &[u8]) -> Result<IngestReport> {
        match PushRequest::from_slice(body) {
            Ok(request) => self.handle(&request.into_envelope()).await,
            Err(e) => {
                ingest_metrics::envelope_received();
                ingest_metrics::decode_failed();
                ingest_metrics::redelivery_requested();
                error!(error = %e, "Rejecting malformed push request");
                Err(IngestError::Decode(e))
            }
        }
    }

    #[instrument(
        skip(self, envelope),
        fields(message_id = %envelope.message_id(), delivery_attempt = ?envelope.delivery_attempt)
    )]
    pub async fn handle(&self, envelope: &DeliveryEnvelope) -> Result<IngestReport> {
        let started = Instant::now();
        ingest_metrics::envelope_received();

        let result = self.run(envelope).await;

        match &result {
            Ok(_) => ingest_metrics::acknowledged(),
            Err(_) => ingest_metrics::redelivery_requested(),
        }
        ingest_metrics::pipeline_duration(started.elapsed().as_secs_f64());
        result
    }

    async fn run(&self, envelope: &DeliveryEnvelope) -> Result<IngestReport> {
        let event = match decode(envelope) {
            Ok(event) => event,
            Err(e) => {
                ingest_metrics::decode_failed();
                error!(error = %e, "Failed to decode delivery envelope");
                return Err(IngestError::Decode(e));
            }
        };

        let event = classify(event);
        if event.anomaly {
            ingest_metrics::anomaly_detected();
        }

        let analytics = match self.analytics.insert(&event).await {
            AnalyticsOutcome::Accepted => {
                ingest_metrics::analytics_inserted();
                info!(
                    sensor_id = %event.sensor_id(),
                    region = %event.region(),
                    anomaly = event.anomaly,
                    "Row inserted into analytics store"
                );
                AnalyticsStatus::Inserted
            }
            AnalyticsOutcome::RowRejections(errors) => {
                ingest_metrics::analytics_rows_rejected(errors.len());
                error!(
                    sensor_id = %event.sensor_id(),
                    region = %event.region(),
                    errors = ?errors,
                    "Analytics store rejected row, continuing with archive"
                );
                AnalyticsStatus::Rejected(errors)
            }
            AnalyticsOutcome::TransportFault(fault) => {
                ingest_metrics::analytics_transport_fault();
                error!(
                    sensor_id = %event.sensor_id(),
                    region = %event.region(),
                    error = %fault,
                    "Analytics store unavailable, requesting redelivery"
                );
                return Err(IngestError::AnalyticsTransport(fault));
            }
        };

        let key = event.archive_key();
        if let Err(fault) = self.archive.put(&key, &event).await {
            ingest_metrics::archive_fault();
            error!(
                sensor_id = %event.sensor_id(),
                region = %event.region(),
                archive_key = %key,
                error = %fault,
                "Archive write failed, requesting redelivery"
            );
            if analytics == AnalyticsStatus::Inserted {
                warn!(
                    sensor_id = %event.sensor_id(),
                    "Redelivery will insert a duplicate analytics row"
                );
            }
            return Err(IngestError::Archive {
                key: key.to_string(),
                source: fault,
            });
        }
        ingest_metrics::archive_written();
        info!(
            sensor_id = %event.sensor_id(),
            region = %event.region(),
            archive_key = %key,
            "Event archived"
        );

        Ok(IngestReport {
            sensor_id: event.event.sensor_id,
            region: event.event.region,
            anomaly: event.anomaly,
            archive_key: key,
            analytics,
        })
    }
}
