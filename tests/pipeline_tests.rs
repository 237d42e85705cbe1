/// Pipeline Tests
///
/// Drive the full parser -> assembler -> dispatcher pipeline against an
/// in-memory sink:
/// - Batch ceilings (count-bound and byte-bound fixtures)
/// - Completeness and order preservation
/// - CSV input and bulk-index directives
/// - Parse and delivery failures
/// - Cancellation

use async_trait::async_trait;
use scp_load::batch::{Batch, BatchLimits};
use scp_load::config::OversizePolicy;
use scp_load::event::EventProperties;
use scp_load::ingest::{EventSink, IngestError};
use scp_load::pipeline::{Pipeline, PipelineError, RunReport};
use scp_load::source::{InputFormat, ParseError};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink that records every batch it accepts
    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<Batch>>,
        delay: Option<Duration>,
        fail_on: Option<u64>,
    }

    impl RecordingSink {
        fn batches(&self) -> Vec<Batch> {
            self.batches.lock().unwrap().clone()
        }

        fn counts(&self) -> Vec<usize> {
            self.batches().iter().map(Batch::event_count).collect()
        }

        fn bodies(&self) -> Vec<Value> {
            self.batches()
                .into_iter()
                .flat_map(|b| b.events)
                .map(|e| e.body)
                .collect()
        }
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn send_batch(&self, batch: &Batch) -> Result<(), IngestError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_on == Some(batch.sequence) {
                return Err(IngestError::Rejected {
                    sequence: batch.sequence,
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            self.batches.lock().unwrap().push(batch.clone());
            Ok(())
        }
    }

    fn limits(max_bytes: u64, max_events: usize) -> BatchLimits {
        BatchLimits {
            max_bytes,
            max_events,
            record_overhead: 38,
            oversize: OversizePolicy::Admit,
        }
    }

    fn props() -> EventProperties {
        EventProperties::new(
            Some("test-host".to_string()),
            Some("fixture".to_string()),
            Some("json".to_string()),
        )
    }

    async fn run_pipeline(
        format: InputFormat,
        input: String,
        limits: BatchLimits,
        sink: Arc<RecordingSink>,
    ) -> RunReport {
        Pipeline::new(format, props(), limits, 16)
            .run(Cursor::new(input.into_bytes()), sink, CancellationToken::new())
            .await
    }

    /// Helper: newline-delimited JSON records with zero-padded ids
    fn json_lines(count: usize, pad: usize) -> String {
        (0..count)
            .map(|i| {
                json!({ "id": format!("{:05}", i), "pad": "x".repeat(pad) }).to_string() + "\n"
            })
            .collect()
    }

    #[tokio::test]
    async fn test_count_ceiling_binds() {
        let sink = Arc::new(RecordingSink::default());
        let report = run_pipeline(
            InputFormat::Json,
            json_lines(1200, 10),
            limits(1_000_000, 500),
            sink.clone(),
        )
        .await;

        assert!(report.is_success());
        assert!(!report.cancelled);
        assert_eq!(sink.counts(), vec![500, 500, 200]);
        assert_eq!(report.counters.batches, 3);
        assert_eq!(report.counters.events, 1200);
        assert_eq!(report.counters.records_produced, 1200);
        assert_eq!(report.counters.bytes, report.counters.bytes_produced);
    }

    #[tokio::test]
    async fn test_byte_ceiling_binds() {
        // Size one record, then pad so each admitted record is exactly 2000 bytes
        let sizing = Arc::new(RecordingSink::default());
        run_pipeline(
            InputFormat::Json,
            json_lines(1, 0),
            limits(1_000_000, 1000),
            sizing.clone(),
        )
        .await;
        let base = sizing.batches()[0].byte_size as usize;
        let pad = 2000 - base;

        let sink = Arc::new(RecordingSink::default());
        let report = run_pipeline(
            InputFormat::Json,
            json_lines(1200, pad),
            limits(1_000_000, 1000),
            sink.clone(),
        )
        .await;

        assert!(report.is_success());
        let batches = sink.batches();
        assert_eq!(batches[0].byte_size, 2000 * 499);
        // 500 records would reach the 1,000,000 byte ceiling exactly
        assert_eq!(sink.counts(), vec![499, 499, 202]);
        for batch in &batches {
            assert!(batch.byte_size < 1_000_000);
            assert!(batch.event_count() <= 1000);
        }
        assert_eq!(report.counters.bytes, 2000 * 1200);
    }

    #[tokio::test]
    async fn test_completeness_and_order() {
        let sink = Arc::new(RecordingSink::default());
        let input = json_lines(137, 3);
        let report =
            run_pipeline(InputFormat::Json, input.clone(), limits(2_000, 7), sink.clone()).await;

        assert!(report.is_success());
        let expected: Vec<Value> = input
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(sink.bodies(), expected);

        let sequences: Vec<u64> = sink.batches().iter().map(|b| b.sequence).collect();
        let ordered: Vec<u64> = (0..sequences.len() as u64).collect();
        assert_eq!(sequences, ordered);

        let total: usize = sink.counts().iter().sum();
        assert_eq!(total, 137);
        for batch in sink.batches() {
            assert!(batch.byte_size < 2_000);
            assert!(batch.event_count() <= 7);
        }
    }

    #[tokio::test]
    async fn test_csv_rows_become_records() {
        let sink = Arc::new(RecordingSink::default());
        let report = run_pipeline(
            InputFormat::Csv,
            "id,name\n1,alpha\n2,beta\n3,gamma\n".to_string(),
            limits(1_000_000, 500),
            sink.clone(),
        )
        .await;

        assert!(report.is_success());
        assert_eq!(
            sink.bodies(),
            vec![
                json!({"id": "1", "name": "alpha"}),
                json!({"id": "2", "name": "beta"}),
                json!({"id": "3", "name": "gamma"}),
            ]
        );

        let event = &sink.batches()[0].events[0];
        assert_eq!(event.host(), Some("test-host"));
        assert_eq!(event.source(), Some("fixture"));
        assert_eq!(event.sourcetype(), Some("json"));
    }

    #[tokio::test]
    async fn test_bulk_index_directive_skipped() {
        let sink = Arc::new(RecordingSink::default());
        let report = run_pipeline(
            InputFormat::Json,
            "{\"index\":{\"_id\":\"1\"}}\n{\"id\":\"1\",\"name\":\"a\"}\n".to_string(),
            limits(1_000_000, 500),
            sink.clone(),
        )
        .await;

        assert!(report.is_success());
        assert_eq!(sink.bodies(), vec![json!({"id": "1", "name": "a"})]);
        assert_eq!(report.counters.events, 1);
    }

    #[tokio::test]
    async fn test_parse_error_delivers_preceding_records() {
        let mut lines: Vec<String> = (1..=10).map(|n| format!("{{\"n\":{}}}", n)).collect();
        lines[4] = "{\"n\": 5,,}".to_string();

        let sink = Arc::new(RecordingSink::default());
        let report = run_pipeline(
            InputFormat::Json,
            lines.join("\n"),
            limits(1_000_000, 500),
            sink.clone(),
        )
        .await;

        match &report.error {
            Some(PipelineError::Parse(ParseError::Json { line, .. })) => assert_eq!(*line, 5),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(!report.cancelled);
        assert_eq!(report.counters.events, 4);
        assert_eq!(
            sink.bodies(),
            vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3}), json!({"n": 4})]
        );
        assert!(report.into_result().is_err());
    }

    #[tokio::test]
    async fn test_bad_array_element_delivers_preceding_records() {
        let mut elements: Vec<String> = (1..=10).map(|n| format!("{{\"n\":{}}}", n)).collect();
        elements[4] = "{\"n\": 5,,}".to_string();

        let sink = Arc::new(RecordingSink::default());
        let report = run_pipeline(
            InputFormat::Json,
            format!("[\n{}\n]", elements.join(",\n")),
            limits(1_000_000, 500),
            sink.clone(),
        )
        .await;

        match &report.error {
            Some(PipelineError::Parse(ParseError::Json { line, .. })) => assert_eq!(*line, 6),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert_eq!(report.counters.events, 4);
        assert_eq!(
            sink.bodies(),
            vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3}), json!({"n": 4})]
        );
    }

    #[tokio::test]
    async fn test_delivery_error_stops_run() {
        let sink = Arc::new(RecordingSink {
            fail_on: Some(1),
            ..RecordingSink::default()
        });
        let report = run_pipeline(
            InputFormat::Json,
            json_lines(50, 1),
            limits(1_000_000, 10),
            sink.clone(),
        )
        .await;

        assert!(matches!(
            report.error,
            Some(PipelineError::Ingest(IngestError::Rejected { sequence: 1, status: 503, .. }))
        ));
        assert_eq!(sink.counts(), vec![10]);
        assert_eq!(report.counters.batches, 1);
        assert_eq!(report.counters.events, 10);
    }

    #[tokio::test]
    async fn test_oversize_reject_policy() {
        let sink = Arc::new(RecordingSink::default());
        let input = format!(
            "{{\"n\":1}}\n{}\n{{\"n\":3}}\n",
            json!({ "blob": "x".repeat(1000) })
        );
        let report = run_pipeline(
            InputFormat::Json,
            input,
            BatchLimits {
                oversize: OversizePolicy::Reject,
                ..limits(500, 100)
            },
            sink.clone(),
        )
        .await;

        assert!(matches!(report.error, Some(PipelineError::Assemble(_))));
        assert_eq!(sink.bodies(), vec![json!({"n": 1})]);
    }

    #[tokio::test]
    async fn test_oversize_admit_policy() {
        let sink = Arc::new(RecordingSink::default());
        let input = format!(
            "{{\"n\":1}}\n{}\n{{\"n\":3}}\n",
            json!({ "blob": "x".repeat(1000) })
        );
        let report = run_pipeline(InputFormat::Json, input, limits(500, 100), sink.clone()).await;

        assert!(report.is_success());
        assert_eq!(sink.counts(), vec![1, 1, 1]);
        assert!(sink.batches()[1].byte_size >= 500);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let sink = Arc::new(RecordingSink::default());
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let report = Pipeline::new(InputFormat::Json, props(), limits(1_000_000, 10), 16)
            .run(Cursor::new(json_lines(100, 1).into_bytes()), sink.clone(), shutdown)
            .await;

        assert!(report.cancelled);
        assert!(report.is_success());
        assert_eq!(report.counters.batches, 0);
        assert!(sink.batches().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_mid_run() {
        let sink = Arc::new(RecordingSink {
            delay: Some(Duration::from_millis(20)),
            ..RecordingSink::default()
        });
        let shutdown = CancellationToken::new();

        let canceller = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
            canceller.cancel();
        });

        let report = tokio::time::timeout(
            Duration::from_secs(10),
            Pipeline::new(InputFormat::Json, props(), limits(1_000_000, 1), 4).run(
                Cursor::new(json_lines(2000, 1).into_bytes()),
                sink.clone(),
                shutdown,
            ),
        )
        .await
        .expect("pipeline should stop promptly after cancellation");

        assert!(report.cancelled);
        assert!(report.is_success());

        let batches = sink.batches();
        assert!(batches.len() < 2000);
        assert_eq!(report.counters.batches, batches.len() as u64);
        assert_eq!(report.counters.events, batches.len() as u64);

        // Delivered exactly once, in order
        let sequences: Vec<u64> = batches.iter().map(|b| b.sequence).collect();
        let ordered: Vec<u64> = (0..sequences.len() as u64).collect();
        assert_eq!(sequences, ordered);
    }
}
