use crate::batch::{AssembleError, BatchLimits};
use crate::config::{Config, RunParams};
use crate::event::EventProperties;
use crate::ingest::{EventSink, IngestError};
use crate::pipeline::counters::PipelineCounters;
use crate::pipeline::report::RunReport;
use crate::pipeline::runner::{run_assembler, run_dispatcher, run_producer};
use crate::pipeline::create_channel;
use crate::source::{EventParser, InputFormat, ParseError};
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Errors that end a pipeline run early
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("batch error: {0}")]
    Assemble(#[from] AssembleError),

    #[error("delivery error: {0}")]
    Ingest(#[from] IngestError),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Parser -> assembler -> dispatcher, connected by bounded channels.
#[derive(Debug, Clone)]
pub struct Pipeline {
    format: InputFormat,
    properties: Arc<EventProperties>,
    limits: BatchLimits,
    channel_capacity: usize,
}

impl Pipeline {
    pub fn new(
        format: InputFormat,
        properties: EventProperties,
        limits: BatchLimits,
        channel_capacity: usize,
    ) -> Self {
        Self {
            format,
            properties: Arc::new(properties),
            limits,
            channel_capacity: channel_capacity.max(1),
        }
    }

    pub fn from_config(params: &RunParams, config: &Config) -> Self {
        Self::new(
            params.format,
            params.properties.clone(),
            BatchLimits::from(&config.batch),
            config.pipeline.channel_capacity,
        )
    }

    /// Run all three stages to completion.
    ///
    /// Returns once the dispatcher has drained, the first stage error
    /// occurred, or `shutdown` was cancelled. Counters in the report only
    /// cover batches the sink accepted.
    pub async fn run<R>(
        self,
        input: R,
        sink: Arc<dyn EventSink>,
        shutdown: CancellationToken,
    ) -> RunReport
    where
        R: Read + Send + 'static,
    {
        let started = Instant::now();
        let counters = Arc::new(PipelineCounters::new());

        let (record_tx, record_rx) = create_channel(self.channel_capacity);
        let (batch_tx, batch_rx) = create_channel(self.channel_capacity);

        let parser = EventParser::new(self.format, input, Arc::clone(&self.properties));

        info!(
            format = %self.format,
            channel_capacity = self.channel_capacity,
            "Starting pipeline"
        );

        let producer_handle = tokio::spawn(run_producer(parser, record_tx, shutdown.clone()));

        let assembler_handle = tokio::spawn(run_assembler(
            record_rx,
            batch_tx,
            self.limits,
            Arc::clone(&counters),
            shutdown.clone(),
        ));

        let dispatcher_handle = tokio::spawn(run_dispatcher(
            batch_rx,
            sink,
            Arc::clone(&counters),
            shutdown.clone(),
        ));

        // Await in flow order; the first failure is the one reported
        let mut first_error: Option<PipelineError> = None;
        collect("record parser", producer_handle, &mut first_error).await;
        collect("batch assembler", assembler_handle, &mut first_error).await;
        collect("batch dispatcher", dispatcher_handle, &mut first_error).await;

        let cancelled = shutdown.is_cancelled();
        if cancelled {
            warn!("Pipeline stopped by cancellation");
        }

        let report = RunReport {
            counters: counters.snapshot(),
            elapsed: started.elapsed(),
            cancelled,
            error: first_error,
        };

        info!(
            batches = report.counters.batches,
            events = report.counters.events,
            bytes = report.counters.bytes,
            "Pipeline shutdown complete"
        );

        report
    }
}

async fn collect<E>(
    stage: &str,
    handle: JoinHandle<Result<(), E>>,
    first_error: &mut Option<PipelineError>,
) where
    E: Into<PipelineError>,
{
    let error: PipelineError = match handle.await {
        Ok(Ok(())) => {
            info!(stage, "Stage completed");
            return;
        }
        Ok(Err(e)) => e.into(),
        Err(e) => e.into(),
    };

    error!(stage, error = %error, "Stage failed");
    if first_error.is_none() {
        *first_error = Some(error);
    }
}
