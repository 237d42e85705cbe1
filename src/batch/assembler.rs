use crate::batch::Batch;
use crate::config::{BatchConfig, OversizePolicy};
use crate::event::Event;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("event of {size} bytes reaches the batch ceiling of {max_bytes} bytes")]
    OversizedRecord { size: u64, max_bytes: u64 },
}

/// Admission ceilings for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// A batch is closed before its byte size would reach this value
    pub max_bytes: u64,
    pub max_events: usize,
    /// Added to each event's encoded length
    pub record_overhead: u64,
    pub oversize: OversizePolicy,
}

impl From<&BatchConfig> for BatchLimits {
    fn from(config: &BatchConfig) -> Self {
        Self {
            max_bytes: config.max_bytes,
            max_events: config.max_events,
            record_overhead: config.record_overhead,
            oversize: config.oversize,
        }
    }
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self::from(&BatchConfig::default())
    }
}

/// Groups events into batches bounded by byte size and event count.
///
/// Events are appended in arrival order. When the next event would push the
/// open batch to `max_bytes` or past `max_events`, the open batch is closed
/// and returned and the event starts a new one. An event whose own size
/// reaches `max_bytes` is either placed alone in a batch or rejected,
/// depending on [`OversizePolicy`].
pub struct BatchAssembler {
    limits: BatchLimits,
    current: BatchBuilder,
    sequence_counter: u64,
}

#[derive(Default)]
struct BatchBuilder {
    events: Vec<Event>,
    byte_size: u64,
}

impl BatchAssembler {
    pub fn new(limits: BatchLimits) -> Self {
        Self {
            limits,
            current: BatchBuilder::default(),
            sequence_counter: 0,
        }
    }

    /// Admission size of an event: encoded length plus the fixed overhead.
    pub fn measure(&self, event: &Event) -> Result<u64, AssembleError> {
        Ok(event.encoded_len()? as u64 + self.limits.record_overhead)
    }

    /// Measure and admit an event.
    /// Returns the batch that was closed to make room, if any.
    pub fn push(&mut self, event: Event) -> Result<Option<Batch>, AssembleError> {
        let size = self.measure(&event)?;
        self.admit(event, size)
    }

    /// Admit an event whose size was already measured.
    pub fn admit(&mut self, event: Event, size: u64) -> Result<Option<Batch>, AssembleError> {
        if size >= self.limits.max_bytes && self.limits.oversize == OversizePolicy::Reject {
            return Err(AssembleError::OversizedRecord {
                size,
                max_bytes: self.limits.max_bytes,
            });
        }

        let current = &self.current;
        let over_bytes = current.byte_size + size >= self.limits.max_bytes;
        let over_count = current.events.len() + 1 > self.limits.max_events;

        let closed = if !current.events.is_empty() && (over_bytes || over_count) {
            self.close_current()
        } else {
            None
        };

        self.current.events.push(event);
        self.current.byte_size += size;

        Ok(closed)
    }

    /// Close and return the open batch, if it holds anything.
    pub fn finish(&mut self) -> Option<Batch> {
        self.close_current()
    }

    /// Number of events waiting in the open batch.
    pub fn pending(&self) -> usize {
        self.current.events.len()
    }

    /// Sequence number the next closed batch will carry.
    pub fn sequence_counter(&self) -> u64 {
        self.sequence_counter
    }

    fn close_current(&mut self) -> Option<Batch> {
        if self.current.events.is_empty() {
            return None;
        }

        let builder = std::mem::take(&mut self.current);
        let batch = Batch {
            batch_id: Uuid::new_v4(),
            sequence: self.sequence_counter,
            events: builder.events,
            byte_size: builder.byte_size,
        };

        self.sequence_counter += 1;
        Some(batch)
    }
}
