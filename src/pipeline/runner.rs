use crate::batch::{AssembleError, Batch, BatchAssembler, BatchLimits};
use crate::event::Event;
use crate::ingest::{EventSink, IngestError};
use crate::pipeline::channel::{recv_or_cancel, send_or_cancel, RecvOutcome, SendOutcome};
use crate::pipeline::counters::PipelineCounters;
use crate::pipeline::{Receiver, Sender};
use crate::source::{EventParser, ParseError};
use std::io::Read;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Run the record parser task.
///
/// Pulls events from the parser and forwards them to the assembler. A parse
/// error ends the task; events already forwarded keep flowing downstream.
pub async fn run_producer<R: Read>(
    mut parser: EventParser<R>,
    output: Sender<Event>,
    ct: CancellationToken,
) -> Result<(), ParseError> {
    let mut produced: u64 = 0;

    info!(format = %parser.format(), "Record parser started");

    loop {
        if ct.is_cancelled() {
            warn!(produced, "Record parser cancelled");
            break;
        }

        let event = match parser.next() {
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                error!(error = %e, produced, "Failed to parse input");
                return Err(e);
            }
            None => {
                info!("End of input reached");
                break;
            }
        };

        match send_or_cancel(&output, event, &ct).await {
            SendOutcome::Sent => produced += 1,
            SendOutcome::Closed => {
                warn!("Record channel closed");
                break;
            }
            SendOutcome::Cancelled => {
                warn!(produced, "Record parser cancelled");
                break;
            }
        }
    }

    info!(
        produced,
        skipped = parser.skipped(),
        "Record parser shutdown complete"
    );

    Ok(())
}

/// Run the batch assembler task.
///
/// Receives events, groups them into batches and forwards closed batches to
/// the dispatcher. When the record channel closes the open batch is flushed;
/// on cancellation it is discarded.
pub async fn run_assembler(
    mut input: Receiver<Event>,
    output: Sender<Batch>,
    limits: BatchLimits,
    counters: Arc<PipelineCounters>,
    ct: CancellationToken,
) -> Result<(), AssembleError> {
    let mut assembler = BatchAssembler::new(limits);

    info!(
        max_bytes = limits.max_bytes,
        max_events = limits.max_events,
        "Batch assembler started"
    );

    loop {
        let event = match recv_or_cancel(&mut input, &ct).await {
            RecvOutcome::Item(event) => event,
            RecvOutcome::Closed => {
                info!("Record channel closed, flushing open batch");
                break;
            }
            RecvOutcome::Cancelled => {
                warn!(
                    pending = assembler.pending(),
                    "Batch assembler cancelled, discarding open batch"
                );
                return Ok(());
            }
        };

        let size = assembler.measure(&event)?;
        let closed = match assembler.admit(event, size) {
            Ok(closed) => closed,
            Err(e) => {
                error!(error = %e, "Event rejected");
                if let Some(batch) = assembler.finish() {
                    forward_batch(&output, batch, &ct).await;
                }
                return Err(e);
            }
        };
        counters.record_admitted(size);

        if let Some(batch) = closed {
            if !forward_batch(&output, batch, &ct).await {
                return Ok(());
            }
        }
    }

    if let Some(batch) = assembler.finish() {
        info!(events = batch.event_count(), "Final batch flush");
        forward_batch(&output, batch, &ct).await;
    }

    info!(
        batches = assembler.sequence_counter(),
        "Batch assembler shutdown complete"
    );

    Ok(())
}

/// Returns false once the batch channel can no longer take batches.
async fn forward_batch(output: &Sender<Batch>, batch: Batch, ct: &CancellationToken) -> bool {
    debug!(
        batch_id = %batch.batch_id,
        sequence = batch.sequence,
        events = batch.event_count(),
        bytes = batch.byte_size,
        "Batch closed"
    );

    match send_or_cancel(output, batch, ct).await {
        SendOutcome::Sent => true,
        SendOutcome::Closed => {
            warn!("Batch channel closed");
            false
        }
        SendOutcome::Cancelled => {
            warn!("Batch assembler cancelled");
            false
        }
    }
}

/// Run the batch dispatcher task.
///
/// Delivers batches one at a time, in order. The first delivery failure ends
/// the task; the batch is not retried.
pub async fn run_dispatcher(
    mut input: Receiver<Batch>,
    sink: Arc<dyn EventSink>,
    counters: Arc<PipelineCounters>,
    ct: CancellationToken,
) -> Result<(), IngestError> {
    let mut dispatched: u64 = 0;

    info!("Batch dispatcher started");

    loop {
        let batch = match recv_or_cancel(&mut input, &ct).await {
            RecvOutcome::Item(batch) => batch,
            RecvOutcome::Closed => {
                info!("Batch channel closed");
                break;
            }
            RecvOutcome::Cancelled => {
                warn!(dispatched, "Batch dispatcher cancelled");
                break;
            }
        };

        let result = tokio::select! {
            biased;
            _ = ct.cancelled() => {
                warn!(
                    batch_id = %batch.batch_id,
                    sequence = batch.sequence,
                    "Batch dispatcher cancelled during delivery, batch not counted"
                );
                break;
            }
            result = sink.send_batch(&batch) => result,
        };

        match result {
            Ok(()) => {
                counters.batch_dispatched(&batch);
                dispatched += 1;
                debug!(
                    batch_id = %batch.batch_id,
                    sequence = batch.sequence,
                    events = batch.event_count(),
                    bytes = batch.byte_size,
                    "Batch delivered"
                );
            }
            Err(e) => {
                error!(
                    batch_id = %batch.batch_id,
                    sequence = batch.sequence,
                    error = %e,
                    "Failed to deliver batch"
                );
                return Err(e);
            }
        }
    }

    info!(dispatched, "Batch dispatcher shutdown complete");

    Ok(())
}
