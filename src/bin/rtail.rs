//! rtail
//!
//! Prints the records of a file last-first, reading it backwards in chunks.

use clap::Parser;
use revscan::{
    ReadAt, ReverseScanner, ScanConfig, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_BUFFER_SIZE,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::mem;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Print the records of a file in reverse order.
#[derive(Parser)]
#[command(name = "rtail")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File to read
    file: PathBuf,

    /// Print at most this many records
    #[arg(short = 'n', long)]
    lines: Option<usize>,

    /// Record delimiter: a single ASCII character, or one of \n, \t, \0
    #[arg(short, long, default_value = "\\n", value_parser = parse_delimiter)]
    delimiter: u8,

    /// Bytes read from the file per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Largest record, in bytes, that can be produced
    #[arg(long, default_value_t = DEFAULT_MAX_BUFFER_SIZE)]
    max_buffer_size: usize,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "\\n" => Ok(b'\n'),
        "\\t" => Ok(b'\t'),
        "\\0" => Ok(0),
        _ if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        _ => Err(format!("delimiter must be a single byte, got {:?}", s)),
    }
}

/// Writes up to `limit` records, newest first, each followed by `delimiter`.
///
/// A delimiter at the very end of the source terminates the last record, so the empty
/// record after it is not written.
fn write_records<R: ReadAt, W: Write>(
    scanner: &mut ReverseScanner<R>,
    limit: usize,
    delimiter: u8,
    out: &mut W,
) -> revscan::Result<usize> {
    let mut printed = 0;
    let mut first = true;
    while printed < limit {
        let record = match scanner.scan()? {
            Some(record) => record,
            None => break,
        };
        if mem::take(&mut first) && record.is_empty() {
            continue;
        }
        out.write_all(&record)?;
        out.write_all(&[delimiter])?;
        printed += 1;
    }
    Ok(printed)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug,revscan=trace")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = ScanConfig::default()
        .with_delimiter(cli.delimiter)
        .with_chunk_size(cli.chunk_size)
        .with_max_buffer_size(cli.max_buffer_size);

    let file = File::open(&cli.file)?;
    let mut scanner = ReverseScanner::from_end_with_config(file, config)?;
    debug!(path = %cli.file.display(), size = scanner.position(), "opened file");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let limit = cli.lines.unwrap_or(usize::MAX);
    let printed = write_records(&mut scanner, limit, cli.delimiter, &mut out)?;
    out.flush()?;

    info!(records = printed, "done");
    Ok(())
}
