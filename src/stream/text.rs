//! Plain-text record stream: one record per line (SPEC_FULL.md §4.2).

use std::io::{BufRead, Write};

use crate::error::{SortxError, SortxResult};
use crate::record::Record;
use crate::value::Value;

use super::{RecordReader, RecordWriter};

pub struct TextReader<R> {
    lines: std::io::Lines<R>,
    path: String,
    skip_blank: bool,
}

impl<R: BufRead> TextReader<R> {
    pub fn new(reader: R, path: impl Into<String>, skip_blank: bool) -> Self {
        TextReader {
            lines: reader.lines(),
            path: path.into(),
            skip_blank,
        }
    }
}

impl<R: BufRead> Iterator for TextReader<R> {
    type Item = SortxResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(SortxError::io(self.path.clone(), e))),
            };
            if self.skip_blank && line.is_empty() {
                continue;
            }
            return Some(Ok(Record::positional_line(line)));
        }
    }
}

impl<R: BufRead> RecordReader for TextReader<R> {}

pub struct TextWriter<W: Write> {
    writer: W,
}

impl<W: Write> TextWriter<W> {
    pub fn new(writer: W) -> Self {
        TextWriter { writer }
    }
}

impl<W: Write> RecordWriter for TextWriter<W> {
    fn write_record(&mut self, record: &Record) -> SortxResult<()> {
        let line = match record {
            Record::Positional(fields) => fields
                .first()
                .map(Value::as_raw_str)
                .unwrap_or_default(),
            Record::Named(map) => map
                .values()
                .next()
                .map(Value::as_raw_str)
                .unwrap_or_default(),
        };
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(SortxError::PlainIo)
    }

    fn finish(mut self: Box<Self>) -> SortxResult<()> {
        self.writer.flush().map_err(SortxError::PlainIo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_lines_as_positional_records() {
        let data = b"file2.txt\nfile10.txt\n".to_vec();
        let reader = TextReader::new(Cursor::new(data), "test.txt", false);
        let rows: Vec<Record> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(rows, vec![
            Record::positional_line("file2.txt"),
            Record::positional_line("file10.txt"),
        ]);
    }

    #[test]
    fn skip_blank_drops_empty_lines() {
        let data = b"a\n\nb\n".to_vec();
        let reader = TextReader::new(Cursor::new(data), "test.txt", true);
        let rows: Vec<Record> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
    }
}
