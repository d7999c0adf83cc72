use crate::app::ports::{AnalyticsOutcome, AnalyticsSinkPort, RowError};
use crate::domain::ClassifiedEvent;
use crate::error::SinkFault;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Analytical store reached through a streaming-insert REST API.
///
/// Sends `{"rows":[{"json": <event>}]}` and maps the per-row `insertErrors`
/// of the response to [`RowError`]s. Network failures and non-2xx statuses
/// (401/403 included) are transport faults.
pub struct HttpAnalyticsSink {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct InsertAllRequest<'a> {
    rows: Vec<InsertRow<'a>>,
}

#[derive(Serialize)]
struct InsertRow<'a> {
    json: &'a ClassifiedEvent,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<InsertErrors>,
}

#[derive(Deserialize)]
struct InsertErrors {
    index: usize,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

impl HttpAnalyticsSink {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            token,
        }
    }

    async fn send(&self, event: &ClassifiedEvent) -> Result<Vec<RowError>, SinkFault> {
        let body = InsertAllRequest {
            rows: vec![InsertRow { json: event }],
        };
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(SinkFault::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: InsertAllResponse = if text.trim().is_empty() {
            InsertAllResponse::default()
        } else {
            serde_json::from_str(&text)?
        };
        Ok(row_errors(parsed))
    }
}

fn row_errors(response: InsertAllResponse) -> Vec<RowError> {
    response
        .insert_errors
        .into_iter()
        .flat_map(|entry| {
            let index = entry.index;
            if entry.errors.is_empty() {
                return vec![RowError {
                    index,
                    reason: "unknown".to_string(),
                    message: String::new(),
                }];
            }
            entry
                .errors
                .into_iter()
                .map(|e| RowError {
                    index,
                    reason: e.reason,
                    message: e.message,
                })
                .collect()
        })
        .collect()
}

#[async_trait]
impl AnalyticsSinkPort for HttpAnalyticsSink {
    async fn insert(&self, event: &ClassifiedEvent) -> AnalyticsOutcome {
        match self.send(event).await {
            Ok(errors) if errors.is_empty() => {
                debug!("Streaming insert accepted by {}", self.endpoint);
                AnalyticsOutcome::Accepted
            }
            Ok(errors) => AnalyticsOutcome::RowRejections(errors),
            Err(fault) => AnalyticsOutcome::TransportFault(fault),
        }
    }
}
