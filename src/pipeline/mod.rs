pub mod channel;
pub mod coordinator;
pub mod counters;
pub mod report;
pub mod runner;
pub mod signal;

pub use channel::{create_channel, Receiver, Sender};
pub use coordinator::{Pipeline, PipelineError};
pub use counters::{CounterSnapshot, PipelineCounters};
pub use report::{RunReport, Summary};
pub use runner::{run_assembler, run_dispatcher, run_producer};
pub use signal::spawn_interrupt_listener;
