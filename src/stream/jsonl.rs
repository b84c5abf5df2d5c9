//! JSONL record stream (SPEC_FULL.md §4.2).

use std::io::{BufRead, Write};

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::error::{SortxError, SortxResult};
use crate::record::Record;
use crate::value::Value;

use super::{RecordReader, RecordWriter};

/// One JSON object per line. Top-level scalars/arrays are rejected as
/// `InvalidRecord` (spec.md §4.2: "object-only").
pub struct JsonlReader<R> {
    lines: std::io::Lines<R>,
    path: String,
    next_offset: u64,
    skip_blank: bool,
}

impl<R: BufRead> JsonlReader<R> {
    pub fn new(reader: R, path: impl Into<String>, skip_blank: bool) -> Self {
        JsonlReader {
            lines: reader.lines(),
            path: path.into(),
            next_offset: 0,
            skip_blank,
        }
    }
}

impl<R: BufRead> Iterator for JsonlReader<R> {
    type Item = SortxResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(SortxError::io(self.path.clone(), e))),
            };
            let offset = self.next_offset;
            self.next_offset += 1;

            if line.trim().is_empty() {
                if self.skip_blank {
                    continue;
                }
                return Some(Ok(Record::Named(IndexMap::new())));
            }

            let parsed: JsonValue = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(e) => {
                    return Some(Err(SortxError::invalid_record(
                        self.path.clone(),
                        Some(offset),
                        e.to_string(),
                    )))
                }
            };

            let object = match parsed {
                JsonValue::Object(map) => map,
                _ => {
                    return Some(Err(SortxError::invalid_record(
                        self.path.clone(),
                        Some(offset),
                        "top-level JSON value is not an object",
                    )))
                }
            };

            let mut fields = IndexMap::with_capacity(object.len());
            for (k, v) in object {
                let value = Value::from_json(v).unwrap_or(Value::Null);
                fields.insert(k, value);
            }
            return Some(Ok(Record::Named(fields)));
        }
    }
}

impl<R: BufRead> RecordReader for JsonlReader<R> {}

pub struct JsonlWriter<W: Write> {
    writer: W,
    field_order: Option<Vec<String>>,
}

impl<W: Write> JsonlWriter<W> {
    pub fn new(writer: W) -> Self {
        JsonlWriter {
            writer,
            field_order: None,
        }
    }
}

impl<W: Write> RecordWriter for JsonlWriter<W> {
    fn write_record(&mut self, record: &Record) -> SortxResult<()> {
        // Field order is fixed by the first record seen (spec.md §4.2);
        // later records missing a field emit `null` for it rather than
        // omitting the key.
        let order = match &self.field_order {
            Some(order) => order.clone(),
            None => {
                let order = record.field_names().unwrap_or_default();
                self.field_order = Some(order.clone());
                order
            }
        };

        let json = match record {
            Record::Named(map) => {
                let mut obj = serde_json::Map::with_capacity(order.len());
                for name in &order {
                    let value = map.get(name).map(Value::to_json).unwrap_or(JsonValue::Null);
                    obj.insert(name.clone(), value);
                }
                JsonValue::Object(obj)
            }
            Record::Positional(fields) => {
                JsonValue::Array(fields.iter().map(Value::to_json).collect())
            }
        };

        serde_json::to_writer(&mut self.writer, &json).map_err(|e| SortxError::Other(e.to_string()))?;
        self.writer
            .write_all(b"\n")
            .map_err(SortxError::PlainIo)
    }

    fn finish(mut self: Box<Self>) -> SortxResult<()> {
        self.writer.flush().map_err(SortxError::PlainIo)
    }
}
