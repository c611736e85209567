//! # Sweep phase
//!
//! A buffer of geometrically distributed run lengths, walked by jumping forward by the value
//! just read. Models the sweep phase of a collector skipping over live blocks of random size:
//! the next address depends on the data, but always lies a short, mostly predictable distance
//! ahead.
use crate::batch::Benchmark;
use crate::config::{bound, parse_u64, split_fields};
use crate::error::BenchError;
use crate::format_size;
use crate::platform::prefetch_read;
use crate::report::{BenchResult, CsvRow, best_of};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Mean run length in 8-byte elements
    pub expected_block_length: u64,
    /// log2 of the buffer length in elements
    pub buffer_length_log: u64,
    pub trials: u64,
    pub prefetch_distance_in_bytes: u64,
}

impl SweepConfig {
    pub const FIELDS: usize = 4;

    /// Parse `expBlockBytes bytesLog trials prefetchDistanceBytes`
    pub fn parse_line(line: &str) -> Result<Self, BenchError> {
        let fields = split_fields(line, Self::FIELDS)?;
        let block_bytes = bound("expBlockBytes", parse_u64("expBlockBytes", fields[0])?, 1, 1024);
        let bytes_log = bound("bytesLog", parse_u64("bytesLog", fields[1])?, 14, 28);
        let trials = bound("trials", parse_u64("trials", fields[2])?, 1, 100);
        let prefetch_distance_in_bytes = bound(
            "prefetchDistanceInBytes",
            parse_u64("prefetchDistanceInBytes", fields[3])?,
            0,
            16384,
        );
        Ok(SweepConfig {
            // runs shorter than one element still advance by one
            expected_block_length: (block_bytes / 8).max(1),
            buffer_length_log: bytes_log - 3,
            trials,
            prefetch_distance_in_bytes,
        })
    }

    pub fn buffer_length(&self) -> u64 {
        1 << self.buffer_length_log
    }
}

impl CsvRow for SweepConfig {
    fn header() -> String {
        "HW10,expBlockBytes,totalKB,trials,prefetchDistanceInBytes".to_string()
    }

    fn to_row(&self) -> String {
        format!(
            "HW10,{},{},{},{}",
            8 * self.expected_block_length,
            1u64 << (self.buffer_length_log - 7),
            self.trials,
            self.prefetch_distance_in_bytes
        )
    }
}

/// Sample a run length from a geometric distribution with the given mean (at least 1)
fn geometric_sample(rng: &mut StdRng, mean: u64) -> u64 {
    let one_minus_p = 1.0 - 1.0 / mean as f64;
    if one_minus_p <= 0.0 {
        return 1;
    }
    // (0, 1], keeps ln finite
    let uniform = 1.0 - rng.random::<f64>();
    (1.0 + uniform.ln() / one_minus_p.ln()).max(1.0) as u64
}

fn init(config: &SweepConfig, seed: u64) -> Result<Vec<u64>, BenchError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let len = config.buffer_length() as usize;
    let mut data = Vec::new();
    data.try_reserve_exact(len)?;
    data.extend((0..len).map(|_| geometric_sample(&mut rng, config.expected_block_length)));
    Ok(data)
}

#[inline(never)]
fn sweep_one_trial<const PREFETCH: bool>(data: &[u64], prefetch_elements: usize) -> BenchResult {
    let mask = data.len() - 1;
    let mut loop_sum = 0u64;
    let mut index = 0usize;

    let start = Instant::now();
    for _ in 0..data.len() {
        if PREFETCH {
            prefetch_read(data.as_ptr().wrapping_add((index + prefetch_elements) & mask));
        }
        let value = data[index];
        loop_sum += value;
        index = (index + value as usize) & mask;
    }
    let elapsed = start.elapsed();

    black_box(index);
    BenchResult::from_elapsed(black_box(loop_sum), elapsed, data.len() as u64)
}

pub struct SweepBench {
    seed: u64,
}

impl SweepBench {
    pub fn new(seed: u64) -> Self {
        SweepBench { seed }
    }

    pub fn test_prefetch_distance(&self, config: &SweepConfig) -> Result<BenchResult, BenchError> {
        info!(
            "Sweep: {} buffer, mean run {} elements, prefetch {} bytes ahead",
            format_size(8 * config.buffer_length()),
            config.expected_block_length,
            config.prefetch_distance_in_bytes
        );
        let data = init(config, self.seed)?;
        let prefetch_elements = (config.prefetch_distance_in_bytes / 8) as usize;
        best_of(config.trials, || {
            Ok(if prefetch_elements > 0 {
                sweep_one_trial::<true>(&data, prefetch_elements)
            } else {
                sweep_one_trial::<false>(&data, prefetch_elements)
            })
        })
    }
}

impl Default for SweepBench {
    fn default() -> Self {
        Self::new(0x5EED_5EE9)
    }
}

impl Benchmark for SweepBench {
    type Config = SweepConfig;

    fn parse_line(&self, line: &str) -> Result<SweepConfig, BenchError> {
        SweepConfig::parse_line(line)
    }

    fn run(&self, config: &SweepConfig) -> Result<BenchResult, BenchError> {
        self.test_prefetch_distance(config)
    }
}
