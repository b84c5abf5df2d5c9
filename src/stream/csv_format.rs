//! CSV/TSV record stream (SPEC_FULL.md §4.2).

use std::io::{BufRead, Read, Write};

use indexmap::IndexMap;

use crate::error::{SortxError, SortxResult};
use crate::record::Record;
use crate::value::Value;

use super::{RecordReader, RecordWriter};

/// Candidates in tie-break order (spec.md §4.1: "ties broken by the
/// order above").
const CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Reads up to 8 KiB of `data`, finds the first non-empty line, and picks
/// the delimiter with the most occurrences there, ties broken by the
/// fixed candidate order.
pub fn detect_delimiter(prefix: &[u8]) -> u8 {
    let capped = &prefix[..prefix.len().min(8192)];
    let first_line = capped
        .split(|&b| b == b'\n')
        .find(|line| !line.is_empty())
        .unwrap_or(capped);

    // `Iterator::max_by_key` keeps the *last* maximum on ties, but ties
    // here must break by candidate order (comma first) — fold keeping
    // the first candidate unless a later one strictly beats it.
    let mut best = CANDIDATES[0];
    let mut best_count = 0usize;
    for &candidate in &CANDIDATES {
        let count = first_line.iter().filter(|&&b| b == candidate).count();
        if count > best_count {
            best_count = count;
            best = candidate;
        }
    }
    best
}

pub struct CsvReader<R> {
    inner: csv::Reader<R>,
    headers: Vec<String>,
    path: String,
    next_offset: u64,
}

impl<R: BufRead> CsvReader<R> {
    /// `delimiter = None` triggers autodetection by peeking the reader's
    /// internal buffer (≤ 8 KiB, per spec.md §4.1) without consuming it.
    pub fn new(mut reader: R, delimiter: Option<u8>, path: impl Into<String>) -> SortxResult<Self> {
        let path = path.into();
        let delimiter = match delimiter {
            Some(d) => d,
            None => {
                let peeked = reader.fill_buf().map_err(|e| SortxError::io(path.clone(), e))?;
                detect_delimiter(peeked)
            }
        };
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers = csv_reader
            .headers()
            .map_err(|e| SortxError::invalid_record(path.clone(), None, e.to_string()))?
            .iter()
            .map(|s| s.to_string())
            .collect();
        Ok(CsvReader {
            inner: csv_reader,
            headers,
            path,
            next_offset: 0,
        })
    }
}

impl<R: Read> Iterator for CsvReader<R> {
    type Item = SortxResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = csv::StringRecord::new();
        match self.inner.read_record(&mut record) {
            Ok(true) => {
                self.next_offset += 1;
                let mut map: IndexMap<String, Value> = IndexMap::new();
                for (i, name) in self.headers.iter().enumerate() {
                    let value = record.get(i).unwrap_or("");
                    map.insert(name.clone(), Value::Str(value.to_string()));
                }
                Some(Ok(Record::Named(map)))
            }
            Ok(false) => None,
            Err(e) => Some(Err(SortxError::invalid_record(
                self.path.clone(),
                Some(self.next_offset),
                e.to_string(),
            ))),
        }
    }
}

impl<R: Read> RecordReader for CsvReader<R> {}

pub struct CsvWriter<W: Write> {
    writer: csv::Writer<W>,
    field_order: Option<Vec<String>>,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(writer: W, delimiter: u8) -> Self {
        CsvWriter {
            writer: csv::WriterBuilder::new()
                .delimiter(delimiter)
                .from_writer(writer),
            field_order: None,
        }
    }
}

impl<W: Write> RecordWriter for CsvWriter<W> {
    fn write_record(&mut self, record: &Record) -> SortxResult<()> {
        let order = match &self.field_order {
            Some(order) => order.clone(),
            None => {
                let order = record.field_names().unwrap_or_default();
                self.writer
                    .write_record(&order)
                    .map_err(|e| SortxError::Other(e.to_string()))?;
                self.field_order = Some(order.clone());
                order
            }
        };

        let row: Vec<String> = match record {
            Record::Named(map) => order
                .iter()
                .map(|name| map.get(name).map(Value::as_raw_str).unwrap_or_default())
                .collect(),
            Record::Positional(fields) => fields.iter().map(Value::as_raw_str).collect(),
        };
        self.writer
            .write_record(&row)
            .map_err(|e| SortxError::Other(e.to_string()))
    }

    fn finish(mut self: Box<Self>) -> SortxResult<()> {
        self.writer
            .flush()
            .map_err(|e| SortxError::PlainIo(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_comma() {
        assert_eq!(detect_delimiter(b"name,age,city\nAlice,25,NYC"), b',');
    }

    #[test]
    fn detects_semicolon() {
        assert_eq!(detect_delimiter(b"name;age;city\nAlice;25;NYC"), b';');
    }

    #[test]
    fn detects_pipe() {
        assert_eq!(detect_delimiter(b"name|age|city\nAlice|25|NYC"), b'|');
    }

    #[test]
    fn ties_break_by_candidate_order_comma_wins() {
        assert_eq!(detect_delimiter(b"a,b;c"), b',');
    }

    #[test]
    fn reads_basic_csv() {
        let data = b"name,age\nAlice,25\nBob,30\n".to_vec();
        let reader = CsvReader::new(std::io::Cursor::new(data), Some(b','), "test.csv").unwrap();
        let rows: Vec<Record> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        match &rows[0] {
            Record::Named(map) => {
                assert_eq!(map.get("name"), Some(&Value::Str("Alice".into())));
                assert_eq!(map.get("age"), Some(&Value::Str("25".into())));
            }
            _ => panic!("expected named record"),
        }
    }
}
