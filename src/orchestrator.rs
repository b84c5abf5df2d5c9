//! Sort Orchestrator (C5): wires the Record Stream, Run Generator, and
//! Merger together and exposes the two public entry points
//! (SPEC_FULL.md §4.5).

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use tempfile::TempDir;

use crate::dedup::{DedupFilter, SkipInvalidFilter};
use crate::error::{SortxError, SortxResult};
use crate::key::{Comparator, DataType, KeySpec};
use crate::locale::{default_collator, Collator};
use crate::merger::merge_runs;
use crate::record::{FieldSelector, Record};
use crate::run_generator::{cleanup, generate_runs, Run};
use crate::stream::{open_input, open_output, Codec, Format, ReadOptions, WriteOptions};

/// Options enumerated in SPEC_FULL.md §4.5.
#[derive(Clone)]
pub struct Options<'a> {
    pub memory_limit: usize,
    pub unique: Option<FieldSelector>,
    pub natural: bool,
    pub skip_blank: bool,
    pub skip_invalid: bool,
    pub stable: bool,
    pub locale: Option<String>,
    pub temp_dir: Option<PathBuf>,
    pub format_in: Option<Format>,
    pub format_out: Option<Format>,
    pub codec_in: Option<Codec>,
    pub codec_out: Option<Codec>,
    pub json_array: bool,
    pub collator: &'a dyn Collator,
}

/// Default 256 MiB memory limit (SPEC_FULL.md §4.5), the process-wide
/// default collator, and every other knob left at its documented
/// default.
impl Default for Options<'_> {
    fn default() -> Self {
        Options {
            memory_limit: 256 * 1024 * 1024,
            unique: None,
            natural: false,
            skip_blank: false,
            skip_invalid: false,
            stable: true,
            locale: None,
            temp_dir: None,
            format_in: None,
            format_out: None,
            codec_in: None,
            codec_out: None,
            json_array: false,
            collator: default_collator(),
        }
    }
}

/// `(lines_processed, runs_generated, peak_memory_bytes_estimate,
/// processing_time_seconds, input_path, output_path)` from spec.md §3,
/// plus the `--skip-invalid`/dedup counters SPEC_FULL.md §4.5 adds.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub lines_processed: u64,
    pub runs_generated: u64,
    pub peak_memory_bytes_estimate: u64,
    pub processing_time_seconds: f64,
    pub input_path: String,
    pub output_path: String,
    pub invalid_records_skipped: u64,
    pub duplicates_dropped: u64,
}

/// Resolves `keys`/`options.natural` into the key vector actually used,
/// per spec.md §9's open-question resolution: explicit keys always win.
/// Keys that don't specify their own `locale` inherit `options.locale`
/// (spec.md §4.5: "default locale tag applied to string keys that don't
/// specify one").
fn resolve_keys(mut keys: Vec<KeySpec>, natural: bool, default_locale: &Option<String>) -> Vec<KeySpec> {
    if keys.is_empty() && natural {
        keys = vec![KeySpec::new(FieldSelector::Index(0), DataType::Nat)];
    }
    if let Some(locale) = default_locale {
        for key in &mut keys {
            if key.locale.is_none() {
                key.locale = Some(locale.clone());
            }
        }
    }
    keys
}

fn build_comparator<'a>(keys: &'a [KeySpec], collator: &'a dyn Collator) -> Comparator<'a> {
    Comparator::new(keys.to_vec(), collator)
}

/// Single-run in-memory path: no temp files, regardless of input size
/// (the caller is responsible for that invariant — this entry point is
/// for already-materialized iterables, e.g. tests and small inputs).
pub fn sort_iter<'a>(
    records: impl Iterator<Item = SortxResult<Record>> + 'a,
    keys: Vec<KeySpec>,
    options: &'a Options<'a>,
) -> SortxResult<Box<dyn Iterator<Item = SortxResult<Record>> + 'a>> {
    let keys = resolve_keys(keys, options.natural, &options.locale);
    let comparator = build_comparator(&keys, options.collator);

    let invalid_skipped = Rc::new(Cell::new(0));
    let duplicates_dropped = Rc::new(Cell::new(0));
    let filtered = DedupFilter::new(
        SkipInvalidFilter::new(records, options.skip_invalid, invalid_skipped),
        options.unique.clone(),
        duplicates_dropped,
    );

    let mut buffer: Vec<Record> = Vec::new();
    for record in filtered {
        buffer.push(record?);
    }
    if options.stable {
        buffer.sort_by(|a, b| comparator.compare(a, b));
    } else {
        buffer.sort_unstable_by(|a, b| comparator.compare(a, b));
    }

    Ok(Box::new(buffer.into_iter().map(Ok)))
}

fn temp_dir_for(options: &Options) -> SortxResult<TempDir> {
    if let Some(dir) = &options.temp_dir {
        tempfile::tempdir_in(dir).map_err(|e| SortxError::io(dir.display().to_string(), e))
    } else if let Ok(env_dir) = std::env::var("SORTX_TMPDIR") {
        tempfile::tempdir_in(&env_dir).map_err(|e| SortxError::io(env_dir, e))
    } else {
        tempfile::tempdir().map_err(SortxError::PlainIo)
    }
}

/// Full external pipeline: opens `input_path`, generates runs bounded by
/// `options.memory_limit`, merges them (bypassing the merger entirely on
/// the single-run fast path), and writes to `output_path`. Returns
/// [`Stats`] when `collect_stats` is set.
pub fn sort_file(
    input_path: &str,
    output_path: &str,
    keys: Vec<KeySpec>,
    options: &Options,
    collect_stats: bool,
) -> SortxResult<Option<Stats>> {
    let start = Instant::now();
    let keys = resolve_keys(keys, options.natural, &options.locale);
    let comparator = build_comparator(&keys, options.collator);

    let read_opts = ReadOptions {
        format: options.format_in,
        delimiter: None,
        codec: options.codec_in,
        skip_blank: options.skip_blank,
        json_array: options.json_array,
    };
    let reader = open_input(input_path, &read_opts)?;

    let temp_dir = temp_dir_for(options)?;

    let invalid_skipped = Rc::new(Cell::new(0));
    let duplicates_dropped_counter = Rc::new(Cell::new(0));
    // Dedup and --skip-invalid both run over the raw input, in true file
    // order, before the run generator buffers or sorts anything — dedup
    // value is orthogonal to sort key (spec.md §4.4), so whichever
    // record the sort would place first isn't necessarily the one that
    // should survive; only true input order decides that.
    let filtered = DedupFilter::new(
        SkipInvalidFilter::new(reader, options.skip_invalid, invalid_skipped.clone()),
        options.unique.clone(),
        duplicates_dropped_counter.clone(),
    );

    let runs = generate_runs(
        filtered,
        &comparator,
        options.memory_limit,
        temp_dir.path(),
        options.stable,
    )?;

    let write_opts = WriteOptions {
        format: options.format_out,
        delimiter: None,
        codec: options.codec_out,
    };

    let write_result = (|| -> SortxResult<u64> {
        let mut writer = open_output(output_path, &write_opts)?;
        let mut lines_processed = 0u64;

        // Fast path: a single in-memory run bypasses the merger entirely
        // (spec.md §4.5).
        if let [Run::Memory(records)] = runs.as_slice() {
            lines_processed = records.len() as u64;
            for record in records {
                writer.write_record(record)?;
            }
            writer.finish()?;
            return Ok(lines_processed);
        }

        let merged = merge_runs(&runs, &comparator)?;
        for record in merged {
            let record = record?;
            writer.write_record(&record)?;
            lines_processed += 1;
        }
        writer.finish()?;
        Ok(lines_processed)
    })();

    let lines_processed = match write_result {
        Ok(v) => v,
        Err(e) => {
            cleanup(&runs);
            return Err(e);
        }
    };

    cleanup(&runs);

    if !collect_stats {
        return Ok(None);
    }

    Ok(Some(Stats {
        lines_processed,
        runs_generated: runs.len() as u64,
        peak_memory_bytes_estimate: options.memory_limit as u64,
        processing_time_seconds: start.elapsed().as_secs_f64(),
        input_path: input_path.to_string(),
        output_path: output_path.to_string(),
        invalid_records_skipped: invalid_skipped.get(),
        duplicates_dropped: duplicates_dropped_counter.get(),
    }))
}
