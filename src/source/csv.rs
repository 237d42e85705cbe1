use super::{now_millis, ParseError};
use crate::event::{Event, EventProperties};
use csv::{Reader, ReaderBuilder, StringRecord};
use serde_json::{Map, Value};
use std::io::Read;
use std::sync::Arc;

/// Events decoded from CSV rows.
///
/// The first row is the header; every following row becomes an object body
/// mapping header name to cell text, in header order. Rows whose field count
/// differs from the header are rejected.
pub struct CsvEvents<R: Read> {
    reader: Reader<R>,
    headers: Option<StringRecord>,
    record: StringRecord,
    properties: Arc<EventProperties>,
    done: bool,
}

impl<R: Read> CsvEvents<R> {
    pub fn new(reader: R, properties: Arc<EventProperties>) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        Self {
            reader,
            headers: None,
            record: StringRecord::new(),
            properties,
            done: false,
        }
    }

    fn fail(&mut self, error: csv::Error) -> Option<Result<Event, ParseError>> {
        self.done = true;
        Some(Err(error.into()))
    }
}

impl<R: Read> Iterator for CsvEvents<R> {
    type Item = Result<Event, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if self.headers.is_none() {
            match self.reader.headers() {
                Ok(headers) => self.headers = Some(headers.clone()),
                Err(e) => return self.fail(e),
            }
        }

        match self.reader.read_record(&mut self.record) {
            Ok(true) => {}
            Ok(false) => {
                self.done = true;
                return None;
            }
            Err(e) => return self.fail(e),
        }

        let headers = self.headers.as_ref()?;
        let body: Map<String, Value> = headers
            .iter()
            .zip(self.record.iter())
            .map(|(name, cell)| (name.to_string(), Value::String(cell.to_string())))
            .collect();

        Some(Ok(Event::new(
            Arc::clone(&self.properties),
            now_millis(),
            Value::Object(body),
        )))
    }
}
