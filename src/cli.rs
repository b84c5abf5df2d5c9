//! Command-line surface (SPEC_FULL.md §6). A thin shell: all the
//! actual sorting lives in [`crate::orchestrator`]. Uses `clap` derive
//! macros; there's no legacy-syntax compatibility burden to carry.

use clap::{Parser, Subcommand};

use crate::error::{SortxError, SortxResult};
use crate::key::KeySpec;
use crate::record::FieldSelector;
use crate::stream::{Codec, Format};

#[derive(Parser, Debug)]
#[command(
    name = "sortx",
    version,
    about = "Sort large record-oriented files (CSV/TSV, JSONL, text) by one or more typed keys",
    long_about = "Sort large record-oriented files by one or more typed keys, producing a fully \
ordered output file whose record schema matches the input. Inputs may exceed available memory; \
the sort runs in bounded RAM via an external merge pipeline."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input path ('-' for standard input; requires --format-in)
    pub input: Option<String>,

    /// Write result to PATH instead of standard output
    #[arg(short, long, value_name = "PATH", default_value = "-")]
    pub output: String,

    /// Sort via a key; SPEC is SELECTOR[:TYPE[:OPT[=VAL]...]], repeatable
    #[arg(short = 'k', long = "key", value_name = "SPEC", action = clap::ArgAction::Append)]
    pub keys: Vec<String>,

    /// Memory budget for the run generator; accepts K/M/G suffixes (decimal)
    #[arg(long, value_name = "SIZE", default_value = "256M")]
    pub memory_limit: String,

    /// Drop later records whose FIELD matches an already-emitted record
    #[arg(long, value_name = "FIELD")]
    pub unique: Option<String>,

    /// Shorthand for `-k 0:nat` when no explicit keys are given
    #[arg(long)]
    pub natural: bool,

    /// Default locale tag applied to string keys that don't specify one
    #[arg(long, value_name = "TAG")]
    pub locale: Option<String>,

    /// Preserve input order among key-equal records (default)
    #[arg(long)]
    pub stable: bool,

    /// Disable input-order tiebreaking within equal keys
    #[arg(long)]
    pub no_stable: bool,

    /// Skip blank lines (text/JSONL)
    #[arg(long)]
    pub skip_blank: bool,

    /// Drop unparseable records instead of failing the whole sort
    #[arg(long)]
    pub skip_invalid: bool,

    /// Treat a top-level JSON array as one record per element
    #[arg(long)]
    pub json_array: bool,

    #[arg(long, value_name = "FORMAT")]
    pub format_in: Option<String>,

    #[arg(long, value_name = "FORMAT")]
    pub format_out: Option<String>,

    #[arg(long, value_name = "CODEC")]
    pub codec_in: Option<String>,

    #[arg(long, value_name = "CODEC")]
    pub codec_out: Option<String>,

    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<String>,

    /// Print statistics to standard error on completion
    #[arg(long)]
    pub stats: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show example invocations
    Examples,
    /// Describe the recognized key data types
    Types,
}

/// Parses a human SIZE spec (`256M`, `4G`, `512K`, a bare byte count)
/// using decimal multipliers, per spec.md §6.
pub fn parse_memory_limit(spec: &str) -> SortxResult<usize> {
    let spec = spec.trim();
    let (digits, multiplier) = match spec.chars().last() {
        Some('K') | Some('k') => (&spec[..spec.len() - 1], 1_000),
        Some('M') | Some('m') => (&spec[..spec.len() - 1], 1_000_000),
        Some('G') | Some('g') => (&spec[..spec.len() - 1], 1_000_000_000),
        _ => (spec, 1),
    };
    digits
        .trim()
        .parse::<usize>()
        .map(|n| n * multiplier)
        .map_err(|_| SortxError::invalid_key_spec(spec, "invalid --memory-limit value"))
}

pub fn parse_keys(specs: &[String]) -> SortxResult<Vec<KeySpec>> {
    specs.iter().map(|s| KeySpec::parse(s)).collect()
}

pub fn parse_format(tag: &Option<String>) -> SortxResult<Option<Format>> {
    match tag {
        None => Ok(None),
        Some(tag) => Format::parse(tag)
            .map(Some)
            .ok_or_else(|| SortxError::invalid_key_spec(tag, "unknown --format value")),
    }
}

pub fn parse_codec(tag: &Option<String>) -> SortxResult<Option<Codec>> {
    match tag {
        None => Ok(None),
        Some(tag) => match tag.as_str() {
            "none" => Ok(Some(Codec::None)),
            "gzip" | "gz" => Ok(Some(Codec::Gzip)),
            #[cfg(feature = "zstd")]
            "zstd" | "zst" => Ok(Some(Codec::Zstd)),
            other => Err(SortxError::invalid_key_spec(other, "unknown --codec value")),
        },
    }
}

pub fn parse_unique(field: &Option<String>) -> Option<FieldSelector> {
    field.as_deref().map(FieldSelector::parse)
}

pub const EXAMPLES_TEXT: &str = "\
sortx input.csv -o output.csv -k age:num
    Sort a CSV by the numeric 'age' column.

sortx input.jsonl -o output.jsonl -k dept:str -k salary:num:desc=true
    Sort JSONL records by department, then salary descending within department.

sortx filenames.txt -o sorted.txt --natural
    Natural sort of a list of filenames (file2 before file10).

sortx big.csv.gz -o big.sorted.csv --memory-limit 64M --stats
    External sort of a gzip-compressed CSV with a 64 MiB run budget, \
reporting statistics to standard error.
";

pub const TYPES_TEXT: &str = "\
str   Compare as text, through the locale collator if --locale is set.
num   Parse as a decimal number (int or float); unparseable values sink last.
date  RFC 3339 / ISO date / \"YYYY-MM-DD HH:MM:SS\" / epoch seconds, compared as instants.
nat   Natural sort: alternating digit/non-digit runs, digits compared numerically.
";
