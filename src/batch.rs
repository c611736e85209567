//! # Batch runner
//!
//! Every benchmark binary behaves the same way: with no argument it prints the CSV header and
//! exits, with a batch file it runs each well-formed line in order and prints one CSV row per
//! line. Lines that don't parse (blank lines, comments, wrong field count) are skipped without
//! any output on stdout; they show up in the log at `debug` level.
use crate::error::BenchError;
use crate::platform::prepare_measurement_thread;
use crate::report::{BenchResult, CsvRow, header_line, row_line};
use clap::Parser;
use log::{debug, error, info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// A benchmark driven by one configuration per batch line
pub trait Benchmark {
    type Config: CsvRow;

    /// Turn a batch line into a clamped configuration
    fn parse_line(&self, line: &str) -> Result<Self::Config, BenchError>;

    /// Build the working set, time it and release it again
    fn run(&self, config: &Self::Config) -> Result<BenchResult, BenchError>;
}

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
pub struct CliArgs {
    /// Batch file with one configuration per line. Without it only the CSV header is printed.
    pub batch_file: Option<PathBuf>,

    /// Pin the benchmark thread to this CPU core
    #[arg(long)]
    pub core: Option<usize>,

    /// Don't try to raise the benchmark thread to maximum priority
    #[arg(long, action)]
    pub no_priority: bool,
}

/// Run every line of `reader` through `bench`, writing one CSV row per accepted line.
///
/// Returns the number of rows written. Configuration errors skip the line; consistency,
/// resource and I/O errors stop the batch.
pub fn run_batch<B, R, W>(bench: &B, reader: R, out: &mut W) -> Result<usize, BenchError>
where
    B: Benchmark,
    R: BufRead,
    W: Write,
{
    let mut rows = 0;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| BenchError::Io {
            context: format!("Could not read batch line {}", line_no + 1),
            source,
        })?;

        let config = match bench.parse_line(&line) {
            Ok(config) => config,
            Err(e) => {
                debug!("Skipping batch line {} ({:?}): {}", line_no + 1, line, e);
                continue;
            }
        };

        let result = match bench.run(&config) {
            Ok(result) => result,
            Err(BenchError::Configuration(msg)) => {
                warn!("Skipping batch line {}: {}", line_no + 1, msg);
                continue;
            }
            Err(e) => return Err(e),
        };

        writeln!(out, "{}", row_line(&config, &result))
            .and_then(|_| out.flush())
            .map_err(|source| BenchError::Io {
                context: "Could not write result row".to_string(),
                source,
            })?;
        rows += 1;
    }
    Ok(rows)
}

fn run_with_args<B: Benchmark>(bench: &B, args: &CliArgs) -> Result<(), BenchError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let Some(path) = &args.batch_file else {
        return writeln!(out, "{}", header_line::<B::Config>()).map_err(|source| BenchError::Io {
            context: "Could not write header".to_string(),
            source,
        });
    };

    let file = File::open(path).map_err(|source| BenchError::Io {
        context: format!("Could not open file {}", path.display()),
        source,
    })?;

    prepare_measurement_thread(args.core, !args.no_priority);
    let rows = run_batch(bench, BufReader::new(file), &mut out)?;
    info!("Batch {} completed, {} rows", path.display(), rows);
    Ok(())
}

fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("warn");
    // only fails if a logger is already installed
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Shared `main` of every benchmark binary
pub fn run_cli<B: Benchmark>(bench: B) -> ExitCode {
    init_logging();
    let args = CliArgs::parse();

    match run_with_args(&bench, &args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
