//! Pre-sort record filters: deduplication and invalid-record skipping
//! (SPEC_FULL.md §4.4, §7).
//!
//! Both run directly over the input stream, in true file order, before
//! any buffering or sorting happens. Dedup value is orthogonal to the
//! sort key (SPEC_FULL.md §4.4: uniqueness is scoped to its own field
//! selector, independent of the key vector), so the record that survives
//! a duplicate group must be whichever one the *input* saw first — not
//! whichever one the sort happens to place first. Filtering before the
//! run generator ever sees the stream makes that the only place dedup
//! needs to live.

use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::error::{SortxError, SortxResult};
use crate::record::{FieldSelector, Record};

/// Drops records whose `selector` value has already been seen, keeping
/// the first-in-input occurrence of each. A `None` selector is a no-op
/// pass-through, so callers can wrap unconditionally.
pub struct DedupFilter<I> {
    inner: I,
    selector: Option<FieldSelector>,
    seen: HashSet<String>,
    dropped: Rc<Cell<u64>>,
}

impl<I> DedupFilter<I> {
    pub fn new(inner: I, selector: Option<FieldSelector>, dropped: Rc<Cell<u64>>) -> Self {
        DedupFilter {
            inner,
            selector,
            seen: HashSet::new(),
            dropped,
        }
    }
}

impl<I: Iterator<Item = SortxResult<Record>>> Iterator for DedupFilter<I> {
    type Item = SortxResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.inner.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(e)),
            };
            let Some(selector) = &self.selector else {
                return Some(Ok(record));
            };
            let value = record
                .get(selector)
                .map(|v| v.as_raw_str())
                .unwrap_or_default();
            if self.seen.insert(value) {
                return Some(Ok(record));
            }
            self.dropped.set(self.dropped.get() + 1);
        }
    }
}

/// Catches `SortxError::InvalidRecord` and counts it instead of
/// propagating, when `enabled`. Every other error variant always
/// propagates, and `enabled = false` makes this a no-op pass-through —
/// fatal-on-first-`InvalidRecord` stays the default (SPEC_FULL.md §7).
pub struct SkipInvalidFilter<I> {
    inner: I,
    enabled: bool,
    skipped: Rc<Cell<u64>>,
}

impl<I> SkipInvalidFilter<I> {
    pub fn new(inner: I, enabled: bool, skipped: Rc<Cell<u64>>) -> Self {
        SkipInvalidFilter {
            inner,
            enabled,
            skipped,
        }
    }
}

impl<I: Iterator<Item = SortxResult<Record>>> Iterator for SkipInvalidFilter<I> {
    type Item = SortxResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(record) => return Some(Ok(record)),
                Err(SortxError::InvalidRecord { .. }) if self.enabled => {
                    self.skipped.set(self.skipped.get() + 1);
                    continue;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use indexmap::IndexMap;

    fn named(id: i64, score: i64) -> SortxResult<Record> {
        let mut map = IndexMap::new();
        map.insert("id".to_string(), Value::Int(id));
        map.insert("score".to_string(), Value::Int(score));
        Ok(Record::Named(map))
    }

    fn score_of(record: &Record) -> i64 {
        match record {
            Record::Named(map) => match map.get("score") {
                Some(Value::Int(i)) => *i,
                _ => panic!("expected int"),
            },
            _ => panic!("expected named"),
        }
    }

    #[test]
    fn keeps_first_in_input_order_not_sorted_order() {
        // ids 1,2,1,3 / scores 95,87,92,91, unique on id: the surviving
        // id=1 record must be the first one seen (score 95), even though
        // a later duplicate (score 92) would sort earlier.
        let records = vec![named(1, 95), named(2, 87), named(1, 92), named(3, 91)];
        let dropped = Rc::new(Cell::new(0));
        let selector = Some(FieldSelector::Name("id".into()));
        let filter = DedupFilter::new(records.into_iter(), selector, dropped.clone());

        let kept: Vec<i64> = filter.map(|r| score_of(&r.unwrap())).collect();
        assert_eq!(kept, vec![95, 87, 91]);
        assert_eq!(dropped.get(), 1);
    }

    #[test]
    fn none_selector_is_a_no_op() {
        let records = vec![named(1, 1), named(1, 2)];
        let dropped = Rc::new(Cell::new(0));
        let filter = DedupFilter::new(records.into_iter(), None, dropped.clone());
        assert_eq!(filter.count(), 2);
        assert_eq!(dropped.get(), 0);
    }

    #[test]
    fn skip_invalid_counts_and_continues_when_enabled() {
        let items: Vec<SortxResult<Record>> = vec![
            named(1, 1),
            Err(SortxError::invalid_record("in", Some(1), "bad")),
            named(2, 2),
        ];
        let skipped = Rc::new(Cell::new(0));
        let filter = SkipInvalidFilter::new(items.into_iter(), true, skipped.clone());
        let kept: Vec<_> = filter.map(|r| r.unwrap()).collect();
        assert_eq!(kept.len(), 2);
        assert_eq!(skipped.get(), 1);
    }

    #[test]
    fn skip_invalid_propagates_when_disabled() {
        let items: Vec<SortxResult<Record>> = vec![
            named(1, 1),
            Err(SortxError::invalid_record("in", Some(1), "bad")),
        ];
        let skipped = Rc::new(Cell::new(0));
        let mut filter = SkipInvalidFilter::new(items.into_iter(), false, skipped.clone());
        assert!(filter.next().unwrap().is_ok());
        assert!(filter.next().unwrap().is_err());
        assert_eq!(skipped.get(), 0);
    }

    #[test]
    fn non_invalid_errors_always_propagate() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let items: Vec<SortxResult<Record>> = vec![Err(SortxError::io("in", io_err))];
        let skipped = Rc::new(Cell::new(0));
        let mut filter = SkipInvalidFilter::new(items.into_iter(), true, skipped.clone());
        assert!(matches!(filter.next(), Some(Err(SortxError::Io { .. }))));
        assert_eq!(skipped.get(), 0);
    }
}
