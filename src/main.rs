mod cli;
mod corpus;
mod encoder;
mod error;
mod pool;

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use itertools::Itertools;

use cli::Cli;
use corpus::{open_input, open_outputs, RowReader};
use encoder::{LenBounds, RowEncoder, RowOutcome, SpmSegmenter};
use error::Error;

#[derive(Debug, Default)]
struct Stats {
    num_empty: u64,
    num_filtered: u64,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    match run(&args) {
        Ok(stats) => {
            eprintln!("skipped {} empty lines", stats.num_empty);
            eprintln!("filtered {} lines", stats.num_filtered);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("spm-encode: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Cli) -> Result<Stats, Error> {
    if args.inputs.len() != args.outputs.len() {
        return Err(Error::InputOutputMismatch {
            inputs: args.inputs.len(),
            outputs: args.outputs.len(),
        });
    }

    let readers = args
        .inputs
        .iter()
        .map(|path| open_input(path))
        .collect::<Result<Vec<_>, _>>()?;
    let mut writers = open_outputs(&args.outputs)?;

    let bounds = LenBounds {
        min: args.min_len,
        max: args.max_len,
    };
    let format = args.output_format;
    let model = args.model.as_path();
    let factory = move || -> Result<RowEncoder<SpmSegmenter>, Error> {
        Ok(RowEncoder::new(SpmSegmenter::load(model)?, format, bounds))
    };

    let rows = RowReader::new(readers).map(|row| row.map_err(Error::from));
    let chunks = rows.chunks(pool::BATCH_ROWS);
    let batches = chunks
        .into_iter()
        .map(|chunk| chunk.collect::<Result<Vec<_>, Error>>());

    let mut stats = Stats::default();
    let mut processed = 0u64;
    pool::map_ordered(args.processes, factory, batches, |rows| {
        for row in rows {
            write_row(&row, &mut writers, &mut stats, args.keep_empty)?;
            processed += 1;
            if processed % 10_000 == 0 {
                eprintln!("processed {processed} lines");
            }
        }
        Ok(())
    })?;

    for writer in &mut writers {
        writer.flush()?;
    }
    Ok(stats)
}

/// Applies the row's fate in the original tool's precedence order: filtered
/// rows drop first, then empty rows unless `--keep-empty`.
fn write_row<W: Write>(
    row: &RowOutcome,
    writers: &mut [W],
    stats: &mut Stats,
    keep_empty: bool,
) -> Result<(), Error> {
    if row.filtered {
        stats.num_filtered += 1;
    } else if row.empty && !keep_empty {
        stats.num_empty += 1;
    } else {
        for (column, writer) in row.columns.iter().zip(writers.iter_mut()) {
            writeln!(writer, "{}", column.as_deref().unwrap_or(""))?;
        }
    }
    Ok(())
}
