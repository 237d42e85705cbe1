//! Record parsers: turn an input byte stream into a lazy sequence of events.
//!
//! Each parser is a plain `Iterator` over `Result<Event, ParseError>`. The
//! sequence is finite and cannot be restarted; the first error ends it.

pub mod csv;
pub mod json;

use crate::event::{Event, EventProperties};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub use self::csv::CsvEvents;
pub use self::json::JsonEvents;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON at line {line}, column {column}: {source}")]
    Json {
        line: usize,
        column: usize,
        source: serde_json::Error,
    },

    #[error("event #{position} has a null body")]
    NullBody { position: u64 },

    #[error("invalid CSV at line {line}: {source}")]
    Csv { line: u64, source: ::csv::Error },

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::csv::Error> for ParseError {
    fn from(source: ::csv::Error) -> Self {
        let line = source.position().map(|pos| pos.line()).unwrap_or(0);
        ParseError::Csv { line, source }
    }
}

/// Input encoding, resolved once before the pipeline is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Json,
    Csv,
}

impl InputFormat {
    /// `.csv` selects CSV; every other extension, or none, falls back to JSON.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => InputFormat::Csv,
            _ => InputFormat::Json,
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Json => f.write_str("json"),
            InputFormat::Csv => f.write_str("csv"),
        }
    }
}

/// Parser for either supported format.
pub enum EventParser<R: Read> {
    Json(JsonEvents<R>),
    Csv(CsvEvents<R>),
}

impl<R: Read> EventParser<R> {
    pub fn new(format: InputFormat, reader: R, properties: Arc<EventProperties>) -> Self {
        match format {
            InputFormat::Json => EventParser::Json(JsonEvents::new(reader, properties)),
            InputFormat::Csv => EventParser::Csv(CsvEvents::new(reader, properties)),
        }
    }

    pub fn format(&self) -> InputFormat {
        match self {
            EventParser::Json(_) => InputFormat::Json,
            EventParser::Csv(_) => InputFormat::Csv,
        }
    }

    /// Number of bulk-index directives dropped so far (always 0 for CSV).
    pub fn skipped(&self) -> u64 {
        match self {
            EventParser::Json(events) => events.skipped(),
            EventParser::Csv(_) => 0,
        }
    }
}

impl<R: Read> Iterator for EventParser<R> {
    type Item = Result<Event, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            EventParser::Json(events) => events.next(),
            EventParser::Csv(events) => events.next(),
        }
    }
}

/// Wall-clock time in milliseconds, stamped on each record at parse time.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
