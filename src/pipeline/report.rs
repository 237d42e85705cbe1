use crate::pipeline::counters::CounterSnapshot;
use crate::pipeline::PipelineError;
use std::fmt;
use std::time::Duration;

/// Outcome of one pipeline run.
#[derive(Debug)]
pub struct RunReport {
    pub counters: CounterSnapshot,
    pub elapsed: Duration,
    /// The run was stopped by the shutdown token
    pub cancelled: bool,
    /// First stage failure, if any. Cancellation is not a failure.
    pub error: Option<PipelineError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn summary(&self) -> Summary {
        Summary {
            counters: self.counters,
            elapsed: self.elapsed,
        }
    }

    pub fn into_result(self) -> Result<CounterSnapshot, PipelineError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.counters),
        }
    }
}

/// Throughput summary printed at the end of a run
#[derive(Debug, Clone, Copy)]
pub struct Summary {
    pub counters: CounterSnapshot,
    pub elapsed: Duration,
}

impl Summary {
    pub fn events_per_sec(&self) -> f64 {
        self.rate(self.counters.events)
    }

    pub fn batches_per_sec(&self) -> f64 {
        self.rate(self.counters.batches)
    }

    pub fn bytes_per_sec(&self) -> f64 {
        self.rate(self.counters.bytes)
    }

    fn rate(&self, total: u64) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            total as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "records read   {}", self.counters.records_produced)?;
        writeln!(f, "event count    {}", self.counters.events)?;
        writeln!(f, "batch count    {}", self.counters.batches)?;
        writeln!(f, "total bytes    {}", self.counters.bytes)?;
        writeln!(f, "duration secs  {:.3}", self.elapsed.as_secs_f64())?;
        writeln!(f, "events/sec     {:.1}", self.events_per_sec())?;
        writeln!(f, "batches/sec    {:.1}", self.batches_per_sec())?;
        write!(f, "bytes/sec      {:.1}", self.bytes_per_sec())
    }
}
