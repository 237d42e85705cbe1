pub mod assembler;

use crate::event::Event;
use uuid::Uuid;

pub use assembler::{AssembleError, BatchAssembler, BatchLimits};

/// A closed group of events delivered in one request.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Client-assigned ID, sent with the request
    pub batch_id: Uuid,

    /// Position in creation order, starting at 0
    pub sequence: u64,

    /// Events in input order
    pub events: Vec<Event>,

    /// Sum of the admission sizes of `events`
    pub byte_size: u64,
}

impl Batch {
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}
