//! `sortx` — external multi-key sort engine CLI (SPEC_FULL.md §6).

use std::process;

use clap::Parser;

use sortx::cli::{
    parse_codec, parse_format, parse_keys, parse_memory_limit, parse_unique, Cli, Commands,
    EXAMPLES_TEXT, TYPES_TEXT,
};
use sortx::error::{SortxError, SortxResult};
use sortx::locale::default_collator;
use sortx::orchestrator::{sort_file, Options};

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("sortx: {e}");
            process::exit(e.exit_code());
        }
    }
}

fn run(cli: Cli) -> SortxResult<()> {
    if let Some(command) = &cli.command {
        match command {
            Commands::Examples => {
                print!("{EXAMPLES_TEXT}");
                return Ok(());
            }
            Commands::Types => {
                print!("{TYPES_TEXT}");
                return Ok(());
            }
        }
    }

    let input = cli.input.clone().ok_or_else(|| {
        SortxError::invalid_key_spec("<missing>", "an input path is required")
    })?;

    let keys = parse_keys(&cli.keys)?;
    let memory_limit = parse_memory_limit(&cli.memory_limit)?;
    let format_in = parse_format(&cli.format_in)?;
    let format_out = parse_format(&cli.format_out)?;
    let codec_in = parse_codec(&cli.codec_in)?;
    let codec_out = parse_codec(&cli.codec_out)?;
    let unique = parse_unique(&cli.unique);
    let stable = !cli.no_stable;

    let collator = default_collator();
    let options = Options {
        memory_limit,
        unique,
        natural: cli.natural,
        skip_blank: cli.skip_blank,
        skip_invalid: cli.skip_invalid,
        stable,
        locale: cli.locale.clone(),
        temp_dir: cli.temp_dir.clone().map(Into::into),
        format_in,
        format_out,
        codec_in,
        codec_out,
        json_array: cli.json_array,
        collator,
    };

    let stats = sort_file(&input, &cli.output, keys, &options, cli.stats)?;

    if let Some(stats) = stats {
        eprintln!(
            "sortx: {} lines, {} runs, ~{} bytes peak, {:.3}s ({} -> {}, {} duplicates dropped, {} invalid records skipped)",
            stats.lines_processed,
            stats.runs_generated,
            stats.peak_memory_bytes_estimate,
            stats.processing_time_seconds,
            stats.input_path,
            stats.output_path,
            stats.duplicates_dropped,
            stats.invalid_records_skipped,
        );
    }

    Ok(())
}
