use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{ArchiveKey, ClassifiedEvent, LatestReading};
use crate::envelope::PushRequest;
use crate::error::SinkFault;

/// Per-row rejection reported by the analytical store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    pub index: usize,
    pub reason: String,
    pub message: String,
}

/// Tagged result of an analytical insert. Row rejections are data, not errors.
#[derive(Debug)]
pub enum AnalyticsOutcome {
    Accepted,
    RowRejections(Vec<RowError>),
    TransportFault(SinkFault),
}

// Sink-side ports
#[async_trait]
pub trait AnalyticsSinkPort: Send + Sync {
    async fn insert(&self, event: &ClassifiedEvent) -> AnalyticsOutcome;
}

#[async_trait]
pub trait ArchiveSinkPort: Send + Sync {
    /// Write the event at `key`, replacing whatever is stored there.
    async fn put(&self, key: &ArchiveKey, event: &ClassifiedEvent) -> Result<(), SinkFault>;
}

#[async_trait]
pub trait ReadingsQueryPort: Send + Sync {
    async fn latest_per_sensor(&self) -> Result<Vec<LatestReading>, SinkFault>;
}

// Producer-side port
#[async_trait]
pub trait EnvelopePublisherPort: Send + Sync {
    async fn publish(&self, request: &PushRequest) -> Result<(), SinkFault>;
}
