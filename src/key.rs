//! Key spec parsing and the comparator algebra (SPEC_FULL.md §4.1).
//!
//! Parses a compact spec string into a typed, per-key option set:
//! `SELECTOR[:TYPE[:OPT[=VAL]...]]`, with `str`/`num`/`date`/`nat` as the
//! recognized comparison types.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{SortxError, SortxResult};
use crate::locale::Collator;
use crate::record::{FieldSelector, Record};
use crate::value::Value;

/// The typed comparison mode for a key (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Str,
    Num,
    Date,
    Nat,
}

impl DataType {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "str" => Some(DataType::Str),
            "num" => Some(DataType::Num),
            "date" => Some(DataType::Date),
            "nat" => Some(DataType::Nat),
            _ => None,
        }
    }
}

/// One entry of a sort key vector: `(selector, data_type, descending, locale?)`.
#[derive(Debug, Clone)]
pub struct KeySpec {
    pub selector: FieldSelector,
    pub data_type: DataType,
    pub descending: bool,
    pub locale: Option<String>,
}

impl KeySpec {
    pub fn new(selector: FieldSelector, data_type: DataType) -> Self {
        KeySpec {
            selector,
            data_type,
            descending: false,
            locale: None,
        }
    }

    /// Parses `SELECTOR[:TYPE[:OPT[=VAL]...]]` (spec.md §4.1).
    pub fn parse(spec: &str) -> SortxResult<Self> {
        let mut parts = spec.split(':');
        let selector_tok = parts.next().filter(|s| !s.is_empty()).ok_or_else(|| {
            SortxError::invalid_key_spec(spec, "missing selector")
        })?;
        let selector = FieldSelector::parse(selector_tok);

        let data_type = match parts.next() {
            Some(tok) => DataType::parse(tok)
                .ok_or_else(|| SortxError::invalid_key_spec(spec, format!("unknown type '{tok}'")))?,
            None => DataType::Str,
        };

        let mut descending = false;
        let mut locale = None;

        for opt in parts {
            let (name, value) = match opt.split_once('=') {
                Some((n, v)) => (n, Some(v)),
                None => (opt, None),
            };
            match name {
                "desc" => {
                    descending = match value {
                        Some("true") => true,
                        Some("false") => false,
                        other => {
                            return Err(SortxError::invalid_key_spec(
                                spec,
                                format!("invalid value for 'desc': {other:?}"),
                            ))
                        }
                    };
                }
                "locale" => {
                    let v = value.ok_or_else(|| {
                        SortxError::invalid_key_spec(spec, "'locale' requires a value")
                    })?;
                    locale = Some(v.to_string());
                }
                other => {
                    return Err(SortxError::invalid_key_spec(
                        spec,
                        format!("unknown option '{other}'"),
                    ))
                }
            }
        }

        Ok(KeySpec {
            selector,
            data_type,
            descending,
            locale,
        })
    }
}

/// The outcome of typed coercion for one key against one record.
#[derive(Debug, Clone, PartialEq)]
enum Coerced {
    Str(String),
    Num(f64),
    Date(DateTime<Utc>),
    Nat(Vec<NatToken>),
}

#[derive(Debug, Clone, PartialEq)]
enum NatToken {
    Digits(String),
    Text(String),
}

fn tokenize_nat(s: &str) -> Vec<NatToken> {
    let mut tokens = Vec::new();
    let mut chars = s.chars().peekable();
    let mut buf = String::new();
    let mut in_digits = false;
    let mut started = false;

    while let Some(&c) = chars.peek() {
        let is_digit = c.is_ascii_digit();
        if started && is_digit != in_digits {
            tokens.push(if in_digits {
                NatToken::Digits(std::mem::take(&mut buf))
            } else {
                NatToken::Text(std::mem::take(&mut buf))
            });
        }
        in_digits = is_digit;
        started = true;
        buf.push(c);
        chars.next();
    }
    if !buf.is_empty() {
        tokens.push(if in_digits {
            NatToken::Digits(buf)
        } else {
            NatToken::Text(buf)
        });
    }
    tokens
}

fn coerce(value: &Value, data_type: DataType) -> Option<Coerced> {
    match data_type {
        DataType::Str => Some(Coerced::Str(value.as_raw_str())),
        DataType::Num => coerce_num(value).map(Coerced::Num),
        DataType::Date => coerce_date(value).map(Coerced::Date),
        DataType::Nat => Some(Coerced::Nat(tokenize_nat(&value.as_raw_str()))),
    }
}

fn coerce_num(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        Value::Str(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(_) | Value::Null | Value::Date(_) => return None,
    };
    if n.is_nan() {
        None
    } else {
        Some(n)
    }
}

/// Recognizers in priority order, per spec.md §4.1.
fn coerce_date(value: &Value) -> Option<DateTime<Utc>> {
    if let Value::Date(d) = value {
        return Some(*d);
    }
    let s = value.as_raw_str();
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if s.len() <= 11 && !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(secs) = s.parse::<i64>() {
            return DateTime::from_timestamp(secs, 0);
        }
    }
    None
}

fn compare_nat(a: &[NatToken], b: &[NatToken], collator: &dyn Collator, locale: Option<&str>) -> Ordering {
    for i in 0..a.len().max(b.len()) {
        match (a.get(i), b.get(i)) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(NatToken::Digits(da)), Some(NatToken::Digits(db))) => {
                let da_trim = da.trim_start_matches('0');
                let db_trim = db.trim_start_matches('0');
                let ord = da_trim
                    .len()
                    .cmp(&db_trim.len())
                    .then_with(|| da_trim.cmp(db_trim));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(ta), Some(tb)) => {
                let sa = match ta {
                    NatToken::Digits(s) | NatToken::Text(s) => s.as_str(),
                };
                let sb = match tb {
                    NatToken::Digits(s) | NatToken::Text(s) => s.as_str(),
                };
                let ord = collator.compare(sa, sb, locale);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
    Ordering::Equal
}

/// Compares two records under a single key. `None` from either side's
/// coercion is a coercion miss: missing values sort after present ones
/// regardless of `descending`, per spec.md §4.1.
fn compare_one_key(key: &KeySpec, a: &Record, b: &Record, collator: &dyn Collator) -> Ordering {
    let av = a.get(&key.selector).and_then(|v| coerce(v, key.data_type));
    let bv = b.get(&key.selector).and_then(|v| coerce(v, key.data_type));

    let ord = match (av, bv) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(Coerced::Str(a)), Some(Coerced::Str(b))) => {
            collator.compare(&a, &b, key.locale.as_deref())
        }
        (Some(Coerced::Num(a)), Some(Coerced::Num(b))) => {
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Coerced::Date(a)), Some(Coerced::Date(b))) => a.cmp(&b),
        (Some(Coerced::Nat(a)), Some(Coerced::Nat(b))) => {
            compare_nat(&a, &b, collator, key.locale.as_deref())
        }
        _ => unreachable!("coerce() always returns the variant matching key.data_type"),
    };

    if key.descending {
        ord.reverse()
    } else {
        ord
    }
}

/// Composes a key vector into a single total-order comparator
/// (spec.md §4.1's lexicographic composition). Input-order stability is
/// applied by callers (the run generator's stable sort, the merger's
/// `run_ordinal` tiebreak), not here.
pub struct Comparator<'a> {
    keys: Vec<KeySpec>,
    collator: &'a dyn Collator,
}

impl<'a> Comparator<'a> {
    pub fn new(keys: Vec<KeySpec>, collator: &'a dyn Collator) -> Self {
        Comparator { keys, collator }
    }

    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for key in &self.keys {
            let ord = compare_one_key(key, a, b, self.collator);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    pub fn keys(&self) -> &[KeySpec] {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::SystemCollator;
    use indexmap::IndexMap;

    fn named(pairs: &[(&str, Value)]) -> Record {
        Record::Named(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect::<IndexMap<_, _>>())
    }

    #[test]
    fn parse_basic_spec() {
        let k = KeySpec::parse("age:num").unwrap();
        assert_eq!(k.selector, FieldSelector::Name("age".into()));
        assert_eq!(k.data_type, DataType::Num);
        assert!(!k.descending);
    }

    #[test]
    fn parse_desc_and_locale() {
        let k = KeySpec::parse("name:str:desc=true:locale=fr").unwrap();
        assert!(k.descending);
        assert_eq!(k.locale.as_deref(), Some("fr"));
    }

    #[test]
    fn parse_positional_selector_defaults_to_str() {
        let k = KeySpec::parse("0").unwrap();
        assert_eq!(k.selector, FieldSelector::Index(0));
        assert_eq!(k.data_type, DataType::Str);
    }

    #[test]
    fn parse_rejects_unknown_option() {
        assert!(KeySpec::parse("age:num:bogus=1").is_err());
    }

    #[test]
    fn parse_rejects_unknown_type() {
        assert!(KeySpec::parse("age:weird").is_err());
    }

    #[test]
    fn numeric_compare_and_coercion_miss_sinks_last() {
        let collator = SystemCollator::new();
        let key = KeySpec::new(FieldSelector::Name("age".into()), DataType::Num);
        let comparator = Comparator::new(vec![key], &collator);

        let a = named(&[("age", Value::Int(25))]);
        let b = named(&[("age", Value::Str("not-a-number".into()))]);
        assert_eq!(comparator.compare(&a, &b), Ordering::Less);
        assert_eq!(comparator.compare(&b, &a), Ordering::Greater);
    }

    #[test]
    fn coercion_miss_ignores_descending() {
        let collator = SystemCollator::new();
        let mut key = KeySpec::new(FieldSelector::Name("age".into()), DataType::Num);
        key.descending = true;
        let comparator = Comparator::new(vec![key], &collator);

        let present = named(&[("age", Value::Int(25))]);
        let missing = named(&[("other", Value::Int(1))]);
        // Missing still sorts after present even though descending=true.
        assert_eq!(comparator.compare(&missing, &present), Ordering::Greater);
        assert_eq!(comparator.compare(&present, &missing), Ordering::Less);
    }

    #[test]
    fn natural_sort_orders_file2_before_file10() {
        let collator = SystemCollator::new();
        let key = KeySpec::new(FieldSelector::Index(0), DataType::Nat);
        let comparator = Comparator::new(vec![key], &collator);

        let a = Record::positional_line("file2.txt");
        let b = Record::positional_line("file10.txt");
        assert_eq!(comparator.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn date_recognizes_rfc3339_and_compares_as_instants() {
        let collator = SystemCollator::new();
        let key = KeySpec::new(FieldSelector::Name("ts".into()), DataType::Date);
        let comparator = Comparator::new(vec![key], &collator);

        let earlier = named(&[("ts", Value::Str("2025-01-15T10:00:00Z".into()))]);
        let later = named(&[("ts", Value::Str("2025-01-15T12:00:00Z".into()))]);
        assert_eq!(comparator.compare(&earlier, &later), Ordering::Less);
    }

    #[test]
    fn date_parses_epoch_seconds() {
        let collator = SystemCollator::new();
        let key = KeySpec::new(FieldSelector::Name("ts".into()), DataType::Date);
        let comparator = Comparator::new(vec![key], &collator);

        let a = named(&[("ts", Value::Str("1000000000".into()))]);
        let b = named(&[("ts", Value::Str("1000000001".into()))]);
        assert_eq!(comparator.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn multi_key_lexicographic_composition() {
        let collator = SystemCollator::new();
        let dept = KeySpec::new(FieldSelector::Name("dept".into()), DataType::Str);
        let mut salary = KeySpec::new(FieldSelector::Name("salary".into()), DataType::Num);
        salary.descending = true;
        let comparator = Comparator::new(vec![dept, salary], &collator);

        let charlie = named(&[("dept", "Engineering".into()), ("salary", Value::Int(90000))]);
        let alice = named(&[("dept", "Engineering".into()), ("salary", Value::Int(85000))]);
        assert_eq!(comparator.compare(&charlie, &alice), Ordering::Less);

        let sales = named(&[("dept", "Sales".into()), ("salary", Value::Int(1))]);
        assert_eq!(comparator.compare(&charlie, &sales), Ordering::Less);
    }
}
