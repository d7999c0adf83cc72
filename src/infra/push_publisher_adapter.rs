use crate::app::ports::EnvelopePublisherPort;
use crate::envelope::PushRequest;
use crate::error::SinkFault;
use async_trait::async_trait;

/// Delivers push requests to an ingestion endpoint over HTTP.
pub struct HttpPushPublisher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPushPublisher {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl EnvelopePublisherPort for HttpPushPublisher {
    async fn publish(&self, request: &PushRequest) -> Result<(), SinkFault> {
        let resp = self.client.post(&self.endpoint).json(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SinkFault::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
