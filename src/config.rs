//! # Configuration
//!
//! Batch files carry one configuration per line as whitespace-separated fields. Numeric fields
//! are clamped into a sane range with [`bound`]; clamping leaves the CSV output untouched but is
//! reported as a `warn!` log line so out-of-range input doesn't go unnoticed.
use crate::error::BenchError;
use crate::pattern::{NextIndexMode, PatternKind};
use crate::primes::PrimeTable;
use crate::report::CsvRow;
use crate::store::ContainerKind;
use log::warn;

/// Clamp `value` into `[min, max]`, logging when it had to move
pub fn bound(name: &str, value: u64, min: u64, max: u64) -> u64 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!("{name} = {value} outside [{min}, {max}], clamped to {clamped}");
    }
    clamped
}

/// Split a batch line into exactly `expected` whitespace-separated fields
pub fn split_fields(line: &str, expected: usize) -> Result<Vec<&str>, BenchError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != expected {
        return Err(BenchError::Configuration(format!(
            "expected {} fields, found {}",
            expected,
            fields.len()
        )));
    }
    Ok(fields)
}

pub fn parse_u64(name: &str, field: &str) -> Result<u64, BenchError> {
    field
        .parse::<u64>()
        .map_err(|e| BenchError::Configuration(format!("{name} '{field}': {e}")))
}

/// Parse a single-letter selector field through `from_char`
pub fn parse_selector<T>(
    name: &str,
    field: &str,
    from_char: impl Fn(char) -> Option<T>,
) -> Result<T, BenchError> {
    field
        .chars()
        .next()
        .and_then(from_char)
        .ok_or_else(|| BenchError::Configuration(format!("unknown {name} '{field}'")))
}

/// Parameters of one permutation-traversal run
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalConfig {
    pub container: ContainerKind,
    pub pattern: PatternKind,
    pub next_index: NextIndexMode,
    /// log2 of the element count, picks the modulus
    pub p_log: u64,
    /// Full-cycle prime modulus, `p - 1` elements are walked
    pub p: u64,
    /// Iterations per unrolled block are `2^block_log`
    pub block_log: u32,
    pub trials: u64,
}

impl TraversalConfig {
    pub const FIELDS: usize = 6;
    pub const MAX_BLOCK_LOG: u64 = 4;
    pub const MAX_TRIALS: u64 = 1000;

    /// Parse `container pattern nextIndex sizeExp blockLog trials`, e.g. `a s r 13 0 5`.
    ///
    /// `sizeExp` is log2 of the working set in bytes; with 8-byte elements the element-count
    /// exponent is `sizeExp - 3`, clamped into the prime table's range.
    pub fn parse_line(line: &str, primes: &PrimeTable) -> Result<Self, BenchError> {
        let fields = split_fields(line, Self::FIELDS)?;
        let container = parse_selector("container", fields[0], ContainerKind::from_char)?;
        let pattern = parse_selector("pattern", fields[1], PatternKind::from_char)?;
        let next_index = parse_selector("nextIndex", fields[2], NextIndexMode::from_char)?;
        let size_exp = parse_u64("sizeExp", fields[3])?;
        let block_log = parse_u64("blockLog", fields[4])?;
        let trials = parse_u64("trials", fields[5])?;

        let logs = primes.log_range();
        let p_log = bound("sizeExp", size_exp, logs.start() + 3, logs.end() + 3) - 3;
        let p = primes.lookup(p_log)?;
        if p < pattern.min_modulus() {
            return Err(BenchError::Configuration(format!(
                "modulus {p} too small for {pattern}"
            )));
        }

        Ok(TraversalConfig {
            container,
            pattern,
            next_index,
            p_log,
            p,
            block_log: bound("blockLog", block_log, 0, Self::MAX_BLOCK_LOG) as u32,
            trials: bound("trials", trials, 1, Self::MAX_TRIALS),
        })
    }

    /// Working set in KiB of 8-byte elements
    pub fn total_kb(&self) -> f64 {
        self.p as f64 / 128.0
    }
}

impl CsvRow for TraversalConfig {
    fn header() -> String {
        "HW10,pLog,totalKB,p,containerFamily,pattern,nextIndex,blockLog,trials".to_string()
    }

    fn to_row(&self) -> String {
        format!(
            "HW10,{},{:.6},{},{},{},{},{},{}",
            self.p_log,
            self.total_kb(),
            self.p,
            self.container,
            self.pattern,
            self.next_index,
            self.block_log,
            self.trials
        )
    }
}
