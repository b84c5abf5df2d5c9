//! Run Generator (C3): fills a memory-bounded buffer and spills sorted
//! runs to temp storage (SPEC_FULL.md §4.3).
//!
//! Buffers fill until [`Record::estimated_size`] crosses the memory
//! budget, sort, and spill to a temp file; the final partial buffer
//! stays in memory when nothing has spilled yet.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use rayon::slice::ParallelSliceMut;

use crate::error::{SortxError, SortxResult};
use crate::key::Comparator;
use crate::record::Record;
use crate::stream::jsonl::{JsonlReader, JsonlWriter};
use crate::stream::{RecordReader, RecordWriter};

/// Buffers above this length are sorted on a rayon thread pool rather
/// than the calling thread (SPEC_FULL.md §4.3's non-normative parallel
/// run sort).
const PARALLEL_SORT_THRESHOLD: usize = 8192;

/// One sorted run: either still in memory (the common case for inputs
/// that fit in a single buffer) or spilled to a temp file.
pub enum Run {
    Memory(Vec<Record>),
    Spilled(PathBuf),
}

impl Run {
    /// Opens this run as a record stream. Spilled runs are always
    /// serialized as JSONL internally regardless of the input's native
    /// format — the merger only needs to read back what the generator
    /// wrote, not round-trip through the original format.
    pub fn open(&self) -> SortxResult<Box<dyn RecordReader>> {
        match self {
            Run::Memory(records) => Ok(Box::new(MemoryRun(records.clone().into_iter()))),
            Run::Spilled(path) => {
                let file = File::open(path).map_err(|e| SortxError::io(path.display().to_string(), e))?;
                Ok(Box::new(JsonlReader::new(
                    BufReader::new(file),
                    path.display().to_string(),
                    false,
                )))
            }
        }
    }
}

struct MemoryRun(std::vec::IntoIter<Record>);

impl Iterator for MemoryRun {
    type Item = SortxResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(Ok)
    }
}

impl RecordReader for MemoryRun {}

/// Consumes `records`, filling an in-memory buffer up to `memory_limit`
/// bytes (estimated), sorting and spilling each time the budget is
/// exceeded. Returns the list of runs in creation order — the caller
/// assigns `run_ordinal`s from this order (spec.md §4.4).
///
/// If nothing was ever spilled, the single returned run is
/// `Run::Memory`, giving the orchestrator its single-run fast path
/// (spec.md §4.3 "end of input" clause (b)).
pub fn generate_runs(
    mut records: impl Iterator<Item = SortxResult<Record>>,
    comparator: &Comparator,
    memory_limit: usize,
    temp_dir: &Path,
    stable: bool,
) -> SortxResult<Vec<Run>> {
    let mut runs = Vec::new();
    let mut buffer: Vec<Record> = Vec::new();
    let mut buffered_bytes: usize = 0;
    let mut next_chunk = 0u64;

    let result = (|| -> SortxResult<()> {
        while let Some(record) = records.next() {
            let record = record?;
            buffered_bytes += record.estimated_size();
            buffer.push(record);

            if buffered_bytes > memory_limit {
                sort_buffer(&mut buffer, comparator, stable);
                let path = spill(&buffer, temp_dir, next_chunk)?;
                next_chunk += 1;
                runs.push(Run::Spilled(path));
                buffer.clear();
                buffered_bytes = 0;
            }
        }

        if !buffer.is_empty() {
            sort_buffer(&mut buffer, comparator, stable);
            if runs.is_empty() {
                runs.push(Run::Memory(std::mem::take(&mut buffer)));
            } else {
                let path = spill(&buffer, temp_dir, next_chunk)?;
                runs.push(Run::Spilled(path));
            }
        }
        Ok(())
    })();

    if let Err(e) = result {
        cleanup(&runs);
        return Err(e);
    }

    Ok(runs)
}

/// Sorts one run's buffer, parallel above [`PARALLEL_SORT_THRESHOLD`]
/// (spec.md §5's non-normative worker-thread carve-out). `stable`
/// selects between the default input-order tiebreak (spec.md §4.5) and
/// `--no-stable`'s unstable sort, which drops it.
fn sort_buffer(buffer: &mut [Record], comparator: &Comparator, stable: bool) {
    let parallel = buffer.len() >= PARALLEL_SORT_THRESHOLD;
    match (stable, parallel) {
        (true, true) => buffer.par_sort_by(|a, b| comparator.compare(a, b)),
        (true, false) => buffer.sort_by(|a, b| comparator.compare(a, b)),
        (false, true) => buffer.par_sort_unstable_by(|a, b| comparator.compare(a, b)),
        (false, false) => buffer.sort_unstable_by(|a, b| comparator.compare(a, b)),
    }
}

fn spill(buffer: &[Record], temp_dir: &Path, ordinal: u64) -> SortxResult<PathBuf> {
    let path = temp_dir.join(format!("sortx-run-{ordinal:08}.jsonl"));
    let file = File::create(&path).map_err(|e| SortxError::io(path.display().to_string(), e))?;
    let mut writer = JsonlWriter::new(BufWriter::new(file));
    for record in buffer {
        writer.write_record(record)?;
    }
    Box::new(writer).finish()?;
    Ok(path)
}

/// Deletes every spilled run file; called on error or cancellation
/// (spec.md §4.3's cancellation clause).
pub fn cleanup(runs: &[Run]) {
    for run in runs {
        if let Run::Spilled(path) = run {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{DataType, KeySpec};
    use crate::locale::SystemCollator;
    use crate::record::FieldSelector;
    use crate::value::Value;
    use indexmap::IndexMap;

    fn named(age: i64) -> SortxResult<Record> {
        let mut map = IndexMap::new();
        map.insert("age".to_string(), Value::Int(age));
        Ok(Record::Named(map))
    }

    #[test]
    fn fits_in_memory_produces_single_run_no_spill() {
        let collator = SystemCollator::new();
        let key = KeySpec::new(FieldSelector::Name("age".into()), DataType::Num);
        let comparator = Comparator::new(vec![key], &collator);

        let records = vec![named(3), named(1), named(2)].into_iter();
        let temp = tempfile::tempdir().unwrap();
        let runs = generate_runs(records, &comparator, 1_000_000, temp.path(), true).unwrap();

        assert_eq!(runs.len(), 1);
        assert!(matches!(runs[0], Run::Memory(_)));
    }

    #[test]
    fn exceeding_memory_limit_spills_multiple_runs() {
        let collator = SystemCollator::new();
        let key = KeySpec::new(FieldSelector::Name("age".into()), DataType::Num);
        let comparator = Comparator::new(vec![key], &collator);

        let records = (0..50).map(|i| named(50 - i));
        let temp = tempfile::tempdir().unwrap();
        // Each record's estimated_size() is ~50 bytes; force a spill every
        // couple of records.
        let runs = generate_runs(records, &comparator, 120, temp.path(), true).unwrap();

        assert!(runs.len() > 1);
        for run in &runs {
            assert!(matches!(run, Run::Spilled(_)));
        }

        let mut total = 0;
        for run in &runs {
            let mut reader = run.open().unwrap();
            while reader.next().is_some() {
                total += 1;
            }
        }
        assert_eq!(total, 50);
    }
}
