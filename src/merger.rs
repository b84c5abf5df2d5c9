//! K-way Merger (C4): heap-based merge of sorted runs (SPEC_FULL.md
//! §4.4).
//!
//! A min-heap keyed by the typed [`Comparator`] instead of raw line
//! bytes. Deduplication does not live here: it runs upstream, over the
//! raw input in true file order, before the run generator ever sees the
//! stream (see [`crate::dedup`]) — by the time records reach the
//! merger, at most one record per dedup value already exists.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::error::SortxResult;
use crate::key::Comparator;
use crate::record::Record;
use crate::run_generator::Run;
use crate::stream::RecordReader;

struct HeapEntry {
    record: Record,
    run_ordinal: usize,
}

/// Wraps a heap entry with the comparator it's ordered by, so
/// `BinaryHeap`'s `Ord` requirement can defer to a runtime comparator
/// instead of a compile-time one. Ties break on ascending `run_ordinal`
/// (spec.md §4.4), which preserves input order because earlier-created
/// runs hold earlier input records.
struct Ranked<'a> {
    entry: HeapEntry,
    comparator: &'a Comparator<'a>,
}

impl PartialEq for Ranked<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Ranked<'_> {}

impl PartialOrd for Ranked<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.comparator
            .compare(&self.entry.record, &other.entry.record)
            .then_with(|| self.entry.run_ordinal.cmp(&other.entry.run_ordinal))
    }
}

/// Merges `runs` into a single ordered sequence of records under the key
/// vector in `comparator`.
pub fn merge_runs<'a>(
    runs: &'a [Run],
    comparator: &'a Comparator<'a>,
) -> SortxResult<impl Iterator<Item = SortxResult<Record>> + 'a> {
    let mut readers: Vec<Box<dyn RecordReader>> =
        runs.iter().map(Run::open).collect::<SortxResult<_>>()?;

    let mut heap: BinaryHeap<Reverse<Ranked<'a>>> = BinaryHeap::new();
    for (ordinal, reader) in readers.iter_mut().enumerate() {
        if let Some(record) = reader.next() {
            heap.push(Reverse(Ranked {
                entry: HeapEntry {
                    record: record?,
                    run_ordinal: ordinal,
                },
                comparator,
            }));
        }
    }

    Ok(MergeIter { readers, heap })
}

struct MergeIter<'a> {
    readers: Vec<Box<dyn RecordReader>>,
    heap: BinaryHeap<Reverse<Ranked<'a>>>,
}

impl<'a> MergeIter<'a> {
    fn advance(&mut self, ordinal: usize, comparator: &'a Comparator<'a>) -> SortxResult<()> {
        if let Some(record) = self.readers[ordinal].next() {
            self.heap.push(Reverse(Ranked {
                entry: HeapEntry {
                    record: record?,
                    run_ordinal: ordinal,
                },
                comparator,
            }));
        }
        Ok(())
    }
}

impl<'a> Iterator for MergeIter<'a> {
    type Item = SortxResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let Reverse(Ranked { entry, comparator }) = self.heap.pop()?;
        let ordinal = entry.run_ordinal;

        if let Err(e) = self.advance(ordinal, comparator) {
            return Some(Err(e));
        }

        Some(Ok(entry.record))
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

    fn named(age: i64) -> Record {
        let mut map = IndexMap::new();
        map.insert("age".to_string(), Value::Int(age));
        Record::Named(map)
    }

    #[test]
    fn merges_two_runs_in_order() {
        let collator = SystemCollator::new();
        let key = KeySpec::new(FieldSelector::Name("age".into()), DataType::Num);
        let comparator = Comparator::new(vec![key], &collator);

        let runs = vec![
            Run::Memory(vec![named(1), named(3), named(5)]),
            Run::Memory(vec![named(2), named(4), named(6)]),
        ];

        let merged: Vec<i64> = merge_runs(&runs, &comparator)
            .unwrap()
            .map(|r| match r.unwrap() {
                Record::Named(map) => match map.get("age") {
                    Some(Value::Int(i)) => *i,
                    _ => panic!("expected int"),
                },
                _ => panic!("expected named"),
            })
            .collect();

        assert_eq!(merged, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn ties_break_by_run_ordinal_preserving_input_order() {
        let collator = SystemCollator::new();
        let key = KeySpec::new(FieldSelector::Name("age".into()), DataType::Num);
        let comparator = Comparator::new(vec![key], &collator);

        // Both runs contain an equal-keyed record; run 0 (lower ordinal)
        // must come first.
        let runs = vec![
            Run::Memory(vec![named(1)]),
            Run::Memory(vec![named(1)]),
        ];

        let count = merge_runs(&runs, &comparator).unwrap().count();
        assert_eq!(count, 2);
    }
}
