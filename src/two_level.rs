//! # Two-level traversal
//!
//! An outer array of nodes, each owning its own inner array. Both levels are doubling
//! permutations: the walk chases `inner.total_accesses` pointers through one node's inner array,
//! then hops to the next outer node and continues from the same inner index there.
//!
//! With prefetching enabled, each outer step first hints the element the walk will resume from
//! in the *next* node's inner array. Because every inner array holds the same permutation, that
//! index is `inner_index * 2^inner_accesses mod inner.p`.
use crate::batch::Benchmark;
use crate::config::{bound, parse_u64, split_fields};
use crate::error::BenchError;
use crate::format_size;
use crate::pattern::PatternKind;
use crate::permutation::build_permutation;
use crate::platform::prefetch_read;
use crate::primes::PrimeTable;
use crate::report::{BenchResult, CsvRow, best_of};
use crate::store::{FlatArray, PermutationStore};
use log::info;
use std::hint::black_box;
use std::time::Instant;

/// Size and access count of one level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelConfig {
    /// Prime element count of each array on this level
    pub p: u64,
    pub total_accesses: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwoLevelConfig {
    pub inner: LevelConfig,
    pub outer: LevelConfig,
    pub enable_prefetch: bool,
    pub trials: u64,
}

impl TwoLevelConfig {
    pub const FIELDS: usize = 6;

    /// Parse `totalLog totalAccesses innerLog innerAccesses enablePrefetch trials`.
    ///
    /// Both logs are in bytes; element-count exponents are 3 less. The outer level gets whatever
    /// exponent is left after the inner one, and the total access budget is split between levels.
    pub fn parse_line(line: &str, primes: &PrimeTable) -> Result<Self, BenchError> {
        let fields = split_fields(line, Self::FIELDS)?;
        let total_log = bound("totalLog", parse_u64("totalLog", fields[0])?, 13, 28) - 3;
        let total_accesses =
            bound("totalAccesses", parse_u64("totalAccesses", fields[1])?, 1, 1_000_000_000);
        let inner_log = bound("innerLog", parse_u64("innerLog", fields[2])?, 8, 15) - 3;
        let inner_accesses =
            bound("innerAccesses", parse_u64("innerAccesses", fields[3])?, 1, 1024);
        let enable_prefetch = bound("enablePrefetch", parse_u64("enablePrefetch", fields[4])?, 0, 1);
        let trials = bound("trials", parse_u64("trials", fields[5])?, 1, 100);

        let outer_log = total_log.checked_sub(inner_log).ok_or_else(|| {
            BenchError::Configuration(format!(
                "inner arrays (2^{inner_log}) larger than the whole working set (2^{total_log})"
            ))
        })?;

        Ok(TwoLevelConfig {
            inner: LevelConfig {
                p: primes.lookup(inner_log)?,
                total_accesses: inner_accesses,
            },
            outer: LevelConfig {
                p: primes.lookup(outer_log)?,
                total_accesses: bound(
                    "outerTotalAccesses",
                    total_accesses / inner_accesses,
                    1,
                    u64::MAX,
                ),
            },
            enable_prefetch: enable_prefetch == 1,
            trials,
        })
    }

    pub fn total_accesses(&self) -> u64 {
        self.inner.total_accesses * self.outer.total_accesses
    }
}

impl CsvRow for TwoLevelConfig {
    fn header() -> String {
        "HW10,innerArrayBytes,innerTotalAccesses,outerArrayBytes,outerTotalAccesses,totalKB,enablePrefetch"
            .to_string()
    }

    fn to_row(&self) -> String {
        format!(
            "HW10,{},{},{},{},{},{}",
            8 * self.inner.p,
            self.inner.total_accesses,
            8 * self.outer.p,
            self.outer.total_accesses,
            self.inner.p * self.outer.p / 128,
            u8::from(self.enable_prefetch)
        )
    }
}

struct OuterNode {
    next_index: u64,
    inner: FlatArray,
}

/// Allocate every outer node with its own copy of the inner permutation
fn init(config: &TwoLevelConfig) -> Result<Vec<OuterNode>, BenchError> {
    let mut successors = FlatArray::with_modulus(config.outer.p)?;
    build_permutation(&mut successors, PatternKind::Cycle, config.outer.p)?;

    let mut template = FlatArray::with_modulus(config.inner.p)?;
    build_permutation(&mut template, PatternKind::Cycle, config.inner.p)?;

    let mut nodes = Vec::new();
    nodes.try_reserve_exact(config.outer.p as usize)?;
    for outer_index in 0..config.outer.p {
        nodes.push(OuterNode {
            next_index: successors.get(outer_index),
            inner: template.try_clone()?,
        });
    }
    successors.release();
    template.release();
    Ok(nodes)
}

/// `2^exp mod p`, the doubling permutation advanced `exp` steps from 1
fn doubling_stride(exp: u64, p: u64) -> u64 {
    let mut result = 1u64;
    for _ in 0..exp {
        result = (result << 1) % p;
    }
    result
}

#[inline(never)]
fn traverse_one_trial<const PREFETCH: bool>(
    nodes: &[OuterNode],
    config: &TwoLevelConfig,
    resume_stride: u64,
) -> BenchResult {
    let mut loop_sum = 0u64;
    let mut inner_index = 1u64;
    let mut outer_index = 1u64;

    let start = Instant::now();
    for _ in 0..config.outer.total_accesses {
        let node = &nodes[outer_index as usize];
        if PREFETCH {
            let resume = inner_index * resume_stride % config.inner.p;
            let next_inner = &nodes[node.next_index as usize].inner;
            prefetch_read(next_inner.as_ptr().wrapping_add(resume as usize));
        }
        for _ in 0..config.inner.total_accesses {
            let value = node.inner.get(inner_index);
            loop_sum += value;
            inner_index = value;
        }
        outer_index = node.next_index;
    }
    let elapsed = start.elapsed();

    black_box(outer_index);
    BenchResult::from_elapsed(black_box(loop_sum), elapsed, config.total_accesses())
}

pub fn test_traversal(config: &TwoLevelConfig) -> Result<BenchResult, BenchError> {
    info!(
        "Two-level: {} outer x {} inner ({}), {} accesses, prefetch {}",
        config.outer.p,
        config.inner.p,
        format_size(8 * config.outer.p * config.inner.p),
        config.total_accesses(),
        config.enable_prefetch
    );
    let nodes = init(config)?;
    let resume_stride = doubling_stride(config.inner.total_accesses, config.inner.p);
    let result = best_of(config.trials, || {
        Ok(if config.enable_prefetch {
            traverse_one_trial::<true>(&nodes, config, resume_stride)
        } else {
            traverse_one_trial::<false>(&nodes, config, resume_stride)
        })
    });
    drop(nodes);
    result
}

/// Two-level traversal benchmark, configured by
/// `totalLog totalAccesses innerLog innerAccesses enablePrefetch trials`
pub struct TwoLevelBench {
    primes: PrimeTable,
}

impl Default for TwoLevelBench {
    fn default() -> Self {
        TwoLevelBench {
            primes: PrimeTable::doubling(),
        }
    }
}

impl Benchmark for TwoLevelBench {
    type Config = TwoLevelConfig;

    fn parse_line(&self, line: &str) -> Result<TwoLevelConfig, BenchError> {
        TwoLevelConfig::parse_line(line, &self.primes)
    }

    fn run(&self, config: &TwoLevelConfig) -> Result<BenchResult, BenchError> {
        test_traversal(config)
    }
}
