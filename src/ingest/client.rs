use super::{EventSink, IngestError};
use crate::auth::Session;
use crate::batch::Batch;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const INGEST_PATH: &str = "ingest/v1beta2/events";
pub const BATCH_ID_HEADER: &str = "X-Batch-Id";

/// HTTP client for the event ingest endpoint
#[derive(Debug)]
pub struct HttpIngestClient {
    events_url: String,
    session: Arc<Session>,
    client: reqwest::Client,
}

impl HttpIngestClient {
    pub fn new(
        base_url: &str,
        session: Arc<Session>,
        timeout: Duration,
    ) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let events_url = format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            session.tenant(),
            INGEST_PATH
        );

        Ok(Self {
            events_url,
            session,
            client,
        })
    }

    pub fn events_url(&self) -> &str {
        &self.events_url
    }
}

#[async_trait]
impl EventSink for HttpIngestClient {
    async fn send_batch(&self, batch: &Batch) -> Result<(), IngestError> {
        debug!(
            batch_id = %batch.batch_id,
            sequence = batch.sequence,
            url = %self.events_url,
            "Posting batch"
        );

        let response = self
            .client
            .post(&self.events_url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("{} {}", self.session.token_type(), self.session.access_token()),
            )
            .header(BATCH_ID_HEADER, batch.batch_id.to_string())
            .json(&batch.events)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IngestError::Rejected {
                sequence: batch.sequence,
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}
