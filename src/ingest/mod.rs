pub mod client;

use crate::batch::Batch;
use async_trait::async_trait;
use thiserror::Error;

pub use client::HttpIngestClient;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Ingest endpoint returned error status {status} for batch {sequence}: {message}")]
    Rejected {
        sequence: u64,
        status: u16,
        message: String,
    },
}

/// Destination for closed batches.
///
/// One call delivers one whole batch. Implementations must not retry on their
/// own: a partially accepted batch sent again would duplicate events.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send_batch(&self, batch: &Batch) -> Result<(), IngestError>;
}
