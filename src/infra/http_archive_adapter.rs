use crate::app::ports::ArchiveSinkPort;
use crate::domain::{ArchiveKey, ClassifiedEvent};
use crate::error::SinkFault;
use async_trait::async_trait;
use tracing::debug;

/// Archive store behind an object-storage REST API.
///
/// Uploads to `{base_url}/storage/v1/object/{bucket}/{key}` with upsert
/// enabled, so an existing object at the same key is replaced.
pub struct HttpArchiveStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    token: Option<String>,
}

impl HttpArchiveStore {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        bucket: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            bucket: bucket.into(),
            token,
        }
    }

    /// Each key segment is percent-encoded, so `?` or `#` in a timestamp stays in the object name.
    fn object_url(&self, key: &ArchiveKey) -> Result<reqwest::Url, SinkFault> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| SinkFault::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| SinkFault::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["storage", "v1", "object", self.bucket.as_str()])
            .extend(key.as_str().split('/'));
        Ok(url)
    }
}

#[async_trait]
impl ArchiveSinkPort for HttpArchiveStore {
    async fn put(&self, key: &ArchiveKey, event: &ClassifiedEvent) -> Result<(), SinkFault> {
        let endpoint = self.object_url(key)?;
        let body = event.to_json()?;

        let mut request = self
            .client
            .put(endpoint)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token).header("apikey", token.as_str());
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SinkFault::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Uploaded {} to bucket {}", key, self.bucket);
        Ok(())
    }
}
