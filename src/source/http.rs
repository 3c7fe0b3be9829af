//! Remote log source over HTTP
//!
//! Wire format:
//! - `GET {base}/partitions` returns `{"partitions":[{"id":0,"last_sequence":41}]}`
//! - `GET {base}/partitions/{p}/events?from=N&max=M&wait_ms=W` returns
//!   `{"events":[{"sequence":N,"enqueued_at":"...","body":"<base64>"}],"end_of_partition":false}`,
//!   or `204 No Content` when nothing arrived within the wait.

use super::types::{FetchOutcome, LogSource, PartitionInfo};
use crate::config::SourceConfig;
use crate::decode::RawEvent;
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::types::{PartitionId, Position};
use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct PartitionsResponse {
    partitions: Vec<PartitionInfo>,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: Vec<EventDto>,
    #[serde(default)]
    end_of_partition: bool,
}

#[derive(Debug, Deserialize)]
struct EventDto {
    sequence: Position,
    #[serde(default)]
    enqueued_at: Option<DateTime<Utc>>,
    body: String,
}

/// Log source backed by a remote log service
#[derive(Debug, Clone)]
pub struct HttpLogSource {
    client: HttpClient,
    base: Url,
}

impl HttpLogSource {
    /// Create a source from an HTTP client whose config carries the base URL
    pub fn new(client: HttpClient) -> Result<Self> {
        let raw = client
            .config()
            .base_url
            .clone()
            .ok_or_else(|| Error::invalid_value("source.base_url", "base URL is required"))?;

        // Url::join replaces the last segment unless the base ends with '/'
        let base = if raw.ends_with('/') {
            Url::parse(&raw)?
        } else {
            Url::parse(&format!("{raw}/"))?
        };

        Ok(Self { client, base })
    }

    /// Build a source from the `source` section of the config file
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        Self::new(HttpClient::with_config(config.http_client_config()?)?)
    }

    /// Base URL every request is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<String> {
        Ok(self.base.join(path)?.to_string())
    }
}

#[async_trait]
impl LogSource for HttpLogSource {
    async fn partitions(&self) -> Result<Vec<PartitionInfo>> {
        let url = self.endpoint("partitions")?;
        let mut response: PartitionsResponse = self.client.get_json(&url, RequestConfig::new()).await?;
        response.partitions.sort_by_key(|p| p.id);

        for (expected, info) in response.partitions.iter().enumerate() {
            if info.id != expected {
                return Err(Error::config(format!(
                    "log service reported partition {} where {expected} was expected",
                    info.id
                )));
            }
        }

        Ok(response.partitions)
    }

    async fn fetch_batch(
        &self,
        partition: PartitionId,
        from: Position,
        max_count: usize,
        max_wait: Duration,
    ) -> Result<FetchOutcome> {
        let url = self.endpoint(&format!("partitions/{partition}/events"))?;
        let request = RequestConfig::new()
            .query("from", from)
            .query("max", max_count)
            .query("wait_ms", max_wait.as_millis())
            .timeout(self.client.config().timeout + max_wait);

        let response = self.client.get(&url, request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(FetchOutcome::Pending);
        }

        let body: EventsResponse = response.json().await.map_err(|e| {
            Error::decode(format!("invalid events response for partition {partition}: {e}"))
        })?;
        debug!(
            partition,
            from,
            events = body.events.len(),
            end = body.end_of_partition,
            "fetched batch"
        );

        if body.events.is_empty() {
            return Ok(if body.end_of_partition {
                FetchOutcome::EndOfPartition
            } else {
                FetchOutcome::Pending
            });
        }

        let events = body
            .events
            .into_iter()
            .map(|dto| {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(&dto.body)
                    .map_err(|e| {
                        Error::decode(format!("event {} has invalid base64 body: {e}", dto.sequence))
                    })?;
                Ok(RawEvent {
                    sequence: dto.sequence,
                    enqueued_at: dto.enqueued_at,
                    body: bytes.into(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FetchOutcome::Events(events))
    }
}
