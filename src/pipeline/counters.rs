use crate::batch::Batch;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals for one pipeline run.
///
/// The assembler is the only writer of the `records_*` counters and the
/// dispatcher the only writer of the dispatch counters. Values are read once
/// the stages have been joined.
#[derive(Debug, Default)]
pub struct PipelineCounters {
    records_produced: AtomicU64,
    bytes_produced: AtomicU64,
    batches_dispatched: AtomicU64,
    events_dispatched: AtomicU64,
    bytes_dispatched: AtomicU64,
}

impl PipelineCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// An event was admitted into a batch.
    pub fn record_admitted(&self, size: u64) {
        self.records_produced.fetch_add(1, Ordering::Relaxed);
        self.bytes_produced.fetch_add(size, Ordering::Relaxed);
    }

    /// A batch was accepted by the sink.
    pub fn batch_dispatched(&self, batch: &Batch) {
        self.batches_dispatched.fetch_add(1, Ordering::Relaxed);
        self.events_dispatched
            .fetch_add(batch.event_count() as u64, Ordering::Relaxed);
        self.bytes_dispatched
            .fetch_add(batch.byte_size, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            records_produced: self.records_produced.load(Ordering::Relaxed),
            bytes_produced: self.bytes_produced.load(Ordering::Relaxed),
            batches: self.batches_dispatched.load(Ordering::Relaxed),
            events: self.events_dispatched.load(Ordering::Relaxed),
            bytes: self.bytes_dispatched.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PipelineCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Events admitted by the assembler
    pub records_produced: u64,
    pub bytes_produced: u64,
    /// Batches accepted by the sink
    pub batches: u64,
    /// Events inside accepted batches
    pub events: u64,
    /// Bytes inside accepted batches
    pub bytes: u64,
}
