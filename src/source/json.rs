use super::{now_millis, ParseError};
use crate::event::{Event, EventProperties};
use serde::de::Error as _;
use serde::Deserialize;
use serde_json::{Deserializer, Value};
use std::io::{self, Bytes, Read};
use std::sync::Arc;
use tracing::debug;

/// Events decoded from a stream of whitespace-separated JSON values.
///
/// If the stream opens with an array, its elements are decoded one at a time
/// and treated as the individual values; anything after the closing bracket
/// is read as further values. Objects carrying an `"index"` key are
/// bulk-index directives and are skipped.
pub struct JsonEvents<R: Read> {
    cursor: ByteCursor<R>,
    layout: Layout,
    properties: Arc<EventProperties>,
    position: u64,
    skipped: u64,
    done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Start,
    Array { first: bool },
    Values,
}

impl<R: Read> JsonEvents<R> {
    pub fn new(reader: R, properties: Arc<EventProperties>) -> Self {
        Self {
            cursor: ByteCursor::new(reader),
            layout: Layout::Start,
            properties,
            position: 0,
            skipped: 0,
            done: false,
        }
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn next_value(&mut self) -> Result<Option<Value>, ParseError> {
        loop {
            let next = self.cursor.skip_whitespace()?;

            match (self.layout, next) {
                (Layout::Start, Some(b'[')) => {
                    self.cursor.bump()?;
                    self.layout = Layout::Array { first: true };
                }
                (Layout::Start, _) => self.layout = Layout::Values,
                (Layout::Array { .. }, None) => {
                    return Err(self.syntax_error("unterminated top-level array".to_string()));
                }
                (Layout::Array { .. }, Some(b']')) => {
                    self.cursor.bump()?;
                    self.layout = Layout::Values;
                }
                (Layout::Array { first: true }, Some(_)) => {
                    self.layout = Layout::Array { first: false };
                    return self.read_value().map(Some);
                }
                (Layout::Array { first: false }, Some(b',')) => {
                    self.cursor.bump()?;
                    self.cursor.skip_whitespace()?;
                    return self.read_value().map(Some);
                }
                (Layout::Array { first: false }, Some(byte)) => {
                    return Err(self.syntax_error(format!(
                        "expected `,` or `]` after array element, found `{}`",
                        byte as char
                    )));
                }
                (Layout::Values, None) => return Ok(None),
                (Layout::Values, Some(_)) => return self.read_value().map(Some),
            }
        }
    }

    /// Decode exactly one value starting at the cursor.
    fn read_value(&mut self) -> Result<Value, ParseError> {
        if let Some(b'-' | b'0'..=b'9') = self.cursor.peek()? {
            return self.read_number();
        }

        let result = {
            let mut de = Deserializer::from_reader(&mut self.cursor);
            Value::deserialize(&mut de)
        };
        result.map_err(|e| self.json_error(e))
    }

    /// The JSON reader looks one byte past a number to find its end, so
    /// numbers are cut out here and decoded from the slice.
    fn read_number(&mut self) -> Result<Value, ParseError> {
        let mut text = Vec::new();
        while let Some(byte) = self.cursor.peek()? {
            if !matches!(byte, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E') {
                break;
            }
            text.push(byte);
            self.cursor.bump()?;
        }

        serde_json::from_slice(&text).map_err(|e| self.json_error(e))
    }

    fn json_error(&self, source: serde_json::Error) -> ParseError {
        if source.is_io() {
            return ParseError::Io(source.into());
        }
        ParseError::Json {
            line: self.cursor.line,
            column: self.cursor.column,
            source,
        }
    }

    /// Points at the unexpected byte, which is still held in the lookahead.
    fn syntax_error(&self, message: String) -> ParseError {
        let pending = usize::from(self.cursor.peeked.is_some());
        ParseError::Json {
            line: self.cursor.line,
            column: self.cursor.column + pending,
            source: serde_json::Error::custom(message),
        }
    }
}

impl<R: Read> Iterator for JsonEvents<R> {
    type Item = Result<Event, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let value = match self.next_value() {
                Ok(Some(value)) => value,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            self.position += 1;

            if is_index_directive(&value) {
                self.skipped += 1;
                debug!(position = self.position, "Skipping bulk-index directive");
                continue;
            }

            if value.is_null() {
                self.done = true;
                return Some(Err(ParseError::NullBody {
                    position: self.position,
                }));
            }

            return Some(Ok(Event::new(
                Arc::clone(&self.properties),
                now_millis(),
                value,
            )));
        }
    }
}

fn is_index_directive(value: &Value) -> bool {
    value
        .as_object()
        .map(|object| object.contains_key("index"))
        .unwrap_or(false)
}

/// Byte reader with one byte of lookahead that tracks the line and column
/// of the last consumed byte.
///
/// The JSON deserializer reads through it one byte at a time, so no input
/// beyond the current value is consumed.
struct ByteCursor<R: Read> {
    bytes: Bytes<R>,
    peeked: Option<u8>,
    line: usize,
    column: usize,
}

impl<R: Read> ByteCursor<R> {
    fn new(reader: R) -> Self {
        Self {
            bytes: reader.bytes(),
            peeked: None,
            line: 1,
            column: 0,
        }
    }

    fn peek(&mut self) -> io::Result<Option<u8>> {
        if self.peeked.is_none() {
            self.peeked = self.bytes.next().transpose()?;
        }
        Ok(self.peeked)
    }

    fn bump(&mut self) -> io::Result<Option<u8>> {
        let byte = match self.peeked.take() {
            Some(byte) => Some(byte),
            None => self.bytes.next().transpose()?,
        };

        match byte {
            Some(b'\n') => {
                self.line += 1;
                self.column = 0;
            }
            Some(_) => self.column += 1,
            None => {}
        }

        Ok(byte)
    }

    /// Returns the first byte that is not JSON whitespace, without consuming it.
    fn skip_whitespace(&mut self) -> io::Result<Option<u8>> {
        while let Some(byte) = self.peek()? {
            match byte {
                b' ' | b'\n' | b'\t' | b'\r' => {
                    self.bump()?;
                }
                _ => return Ok(Some(byte)),
            }
        }
        Ok(None)
    }
}

impl<R: Read> Read for ByteCursor<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.bump()? {
            Some(byte) => {
                buf[0] = byte;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
