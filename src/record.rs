//! The `Record`/`FieldSelector` model (SPEC_FULL.md §3, §9).

use indexmap::IndexMap;

use crate::value::Value;

/// A field name or a non-negative positional index. Resolution against a
/// record may fail to resolve (spec.md §4.2); callers treat that as a
/// coercion miss, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldSelector {
    Name(String),
    Index(usize),
}

impl FieldSelector {
    /// Parses a bare selector token: an integer parses as a positional
    /// index, anything else is a field name (spec.md §4.1 grammar).
    pub fn parse(token: &str) -> Self {
        match token.parse::<usize>() {
            Ok(idx) => FieldSelector::Index(idx),
            Err(_) => FieldSelector::Name(token.to_string()),
        }
    }
}

impl std::fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldSelector::Name(n) => write!(f, "{n}"),
            FieldSelector::Index(i) => write!(f, "{i}"),
        }
    }
}

/// A logical row: either a named mapping (CSV/TSV/JSONL) or a positional
/// sequence (plain text, width 1).
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Named(IndexMap<String, Value>),
    Positional(Vec<Value>),
}

impl Record {
    pub fn positional_line(line: impl Into<String>) -> Self {
        Record::Positional(vec![Value::Str(line.into())])
    }

    /// Resolves a selector against this record. Returns `None` on a
    /// `SelectorUnresolved` condition (spec.md §7): a name absent from a
    /// named record, or an index absent from a positional one. Named
    /// records also accept a positional index selector (treated as "the
    /// n-th field in insertion order"), since CLI key specs may be
    /// numeric even against delimited formats.
    pub fn get(&self, selector: &FieldSelector) -> Option<&Value> {
        match (self, selector) {
            (Record::Named(map), FieldSelector::Name(name)) => map.get(name),
            (Record::Named(map), FieldSelector::Index(idx)) => {
                map.get_index(*idx).map(|(_, v)| v)
            }
            (Record::Positional(fields), FieldSelector::Index(idx)) => fields.get(*idx),
            (Record::Positional(_), FieldSelector::Name(_)) => None,
        }
    }

    /// An estimate, in bytes, of this record's live payload: the sum of
    /// its field value byte-lengths plus a fixed per-field overhead
    /// (spec.md §4.3). Used by the run generator to decide when to spill.
    pub fn estimated_size(&self) -> usize {
        const PER_FIELD_OVERHEAD: usize = 48;
        match self {
            Record::Named(map) => map
                .iter()
                .map(|(k, v)| k.len() + v.as_raw_str().len() + PER_FIELD_OVERHEAD)
                .sum(),
            Record::Positional(fields) => fields
                .iter()
                .map(|v| v.as_raw_str().len() + PER_FIELD_OVERHEAD)
                .sum(),
        }
    }

    pub fn field_names(&self) -> Option<Vec<String>> {
        match self {
            Record::Named(map) => Some(map.keys().cloned().collect()),
            Record::Positional(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(pairs: &[(&str, Value)]) -> Record {
        Record::Named(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn selector_parses_index_vs_name() {
        assert_eq!(FieldSelector::parse("3"), FieldSelector::Index(3));
        assert_eq!(FieldSelector::parse("age"), FieldSelector::Name("age".into()));
        assert_eq!(FieldSelector::parse("0"), FieldSelector::Index(0));
    }

    #[test]
    fn named_record_resolves_by_name() {
        let rec = named(&[("name", Value::Str("Alice".into())), ("age", Value::Int(25))]);
        assert_eq!(
            rec.get(&FieldSelector::Name("age".into())),
            Some(&Value::Int(25))
        );
        assert_eq!(rec.get(&FieldSelector::Name("missing".into())), None);
    }

    #[test]
    fn positional_record_resolves_by_index() {
        let rec = Record::positional_line("file2.txt");
        assert_eq!(
            rec.get(&FieldSelector::Index(0)),
            Some(&Value::Str("file2.txt".into()))
        );
        assert_eq!(rec.get(&FieldSelector::Index(1)), None);
    }

    #[test]
    fn positional_selector_on_named_record_uses_insertion_order() {
        let rec = named(&[("name", Value::Str("Alice".into())), ("age", Value::Int(25))]);
        assert_eq!(
            rec.get(&FieldSelector::Index(1)),
            Some(&Value::Int(25))
        );
    }
}
