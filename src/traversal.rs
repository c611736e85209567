//! # Permutation traversal
//!
//! The timed core: walk a materialized permutation cycle of `P - 1` elements, summing every value
//! read, and report the best time per access over `trials` walks.
//!
//! Every axis of a configuration (backend, pattern, next-index rule, unroll factor) is a type or
//! const parameter of [`traverse_one_trial`], so each of the 4 x 4 x 2 x 5 combinations gets its
//! own monomorphized loop with the advance rule and backend lookup inlined. The `test_*` chain
//! below turns a runtime [`TraversalConfig`] into the matching instantiation.
use crate::batch::Benchmark;
use crate::config::TraversalConfig;
use crate::error::BenchError;
use crate::format_size;
use crate::pattern::{
    AccessPattern, CalculateNext, Cycle, LongStride, MediumStride, NextIndex, NextIndexMode,
    PatternKind, ReadNext, Sequential,
};
use crate::permutation::build_permutation;
use crate::primes::PrimeTable;
use crate::report::{BenchResult, best_of};
use crate::store::{ContainerKind, FlatArray, GrowableArray, HashedMap, OrderedMap, PermutationStore};
use log::info;
use std::hint::black_box;
use std::time::Instant;

#[inline(always)]
fn step<S: PermutationStore, A: AccessPattern, N: NextIndex>(
    store: &S,
    p: u64,
    index: &mut u64,
    loop_sum: &mut u64,
) {
    let value = store.get(*index);
    *loop_sum += value;
    *index = N::next::<A>(*index, value, p);
}

/// One timed walk over all `p - 1` elements, in blocks of `2^B_LOG` iterations plus a remainder
#[inline(never)]
pub fn traverse_one_trial<S, A, N, const B_LOG: u32>(store: &S, p: u64) -> BenchResult
where
    S: PermutationStore,
    A: AccessPattern,
    N: NextIndex,
{
    let block_size = 1u64 << B_LOG;
    let num_blocks = (p - 1) >> B_LOG;
    let remainder = (p - 1) & (block_size - 1);
    let mut index = 1u64;
    let mut loop_sum = 0u64;

    let start = Instant::now();
    for _ in 0..num_blocks {
        for _ in 0..block_size {
            step::<S, A, N>(store, p, &mut index, &mut loop_sum);
        }
    }
    for _ in 0..remainder {
        step::<S, A, N>(store, p, &mut index, &mut loop_sum);
    }
    let elapsed = start.elapsed();

    // Prevent dead code elimination
    black_box(index);
    BenchResult::from_elapsed(black_box(loop_sum), elapsed, p - 1)
}

/// Best of `trials` walks over an already initialized store
pub fn traverse<S, A, N, const B_LOG: u32>(
    store: &S,
    p: u64,
    trials: u64,
) -> Result<BenchResult, BenchError>
where
    S: PermutationStore,
    A: AccessPattern,
    N: NextIndex,
{
    best_of(trials, || Ok(traverse_one_trial::<S, A, N, B_LOG>(store, p)))
}

fn test_traversal<S, A, N, const B_LOG: u32>(
    config: &TraversalConfig,
    store: &mut S,
) -> Result<BenchResult, BenchError>
where
    S: PermutationStore,
    A: AccessPattern,
    N: NextIndex,
{
    build_permutation(store, A::KIND, config.p)?;
    traverse::<S, A, N, B_LOG>(store, config.p, config.trials)
}

fn test_next_index<S: PermutationStore, A: AccessPattern, const B_LOG: u32>(
    config: &TraversalConfig,
    store: &mut S,
) -> Result<BenchResult, BenchError> {
    match config.next_index {
        NextIndexMode::CalculateNext => test_traversal::<S, A, CalculateNext, B_LOG>(config, store),
        NextIndexMode::ReadNext => test_traversal::<S, A, ReadNext, B_LOG>(config, store),
    }
}

fn test_access_pattern<S: PermutationStore, const B_LOG: u32>(
    config: &TraversalConfig,
    store: &mut S,
) -> Result<BenchResult, BenchError> {
    match config.pattern {
        PatternKind::Cycle => test_next_index::<S, Cycle, B_LOG>(config, store),
        PatternKind::Sequential => test_next_index::<S, Sequential, B_LOG>(config, store),
        PatternKind::MediumStride => test_next_index::<S, MediumStride, B_LOG>(config, store),
        PatternKind::LongStride => test_next_index::<S, LongStride, B_LOG>(config, store),
    }
}

fn test_blocking_factor<S: PermutationStore>(
    config: &TraversalConfig,
    store: &mut S,
) -> Result<BenchResult, BenchError> {
    match config.block_log {
        0 => test_access_pattern::<S, 0>(config, store),
        1 => test_access_pattern::<S, 1>(config, store),
        2 => test_access_pattern::<S, 2>(config, store),
        3 => test_access_pattern::<S, 3>(config, store),
        4 => test_access_pattern::<S, 4>(config, store),
        other => Err(BenchError::Configuration(format!(
            "unsupported blockLog {other}"
        ))),
    }
}

fn test_container<S: PermutationStore>(config: &TraversalConfig) -> Result<BenchResult, BenchError> {
    let mut store = S::with_modulus(config.p)?;
    let result = test_blocking_factor(config, &mut store);
    store.release();
    result
}

/// Allocate the configured backend, build the permutation, time it and release the backend
pub fn test_data_structure(config: &TraversalConfig) -> Result<BenchResult, BenchError> {
    info!(
        "{} {} {} over {} (p = {}), blockLog {}, {} trials",
        config.container,
        config.pattern,
        config.next_index,
        format_size(8 * (config.p - 1)),
        config.p,
        config.block_log,
        config.trials
    );
    match config.container {
        ContainerKind::Array => test_container::<FlatArray>(config),
        ContainerKind::Vector => test_container::<GrowableArray>(config),
        ContainerKind::Map => test_container::<OrderedMap>(config),
        ContainerKind::UnorderedMap => test_container::<HashedMap>(config),
    }
}

/// Permutation traversal benchmark, configured by `container pattern nextIndex sizeExp blockLog trials`
pub struct PermutationBench {
    primes: PrimeTable,
}

impl PermutationBench {
    pub fn new(primes: PrimeTable) -> Self {
        PermutationBench { primes }
    }
}

impl Default for PermutationBench {
    fn default() -> Self {
        Self::new(PrimeTable::permutation())
    }
}

impl Benchmark for PermutationBench {
    type Config = TraversalConfig;

    fn parse_line(&self, line: &str) -> Result<TraversalConfig, BenchError> {
        TraversalConfig::parse_line(line, &self.primes)
    }

    fn run(&self, config: &TraversalConfig) -> Result<BenchResult, BenchError> {
        test_data_structure(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    const P: u64 = 947;
    const SUM_1_TO_946: u64 = 947 * 946 / 2;

    fn config(
        container: ContainerKind,
        pattern: PatternKind,
        next_index: NextIndexMode,
        block_log: u32,
        trials: u64,
    ) -> TraversalConfig {
        TraversalConfig {
            container,
            pattern,
            next_index,
            p_log: 10,
            p: P,
            block_log,
            trials,
        }
    }

    /// Array store that logs every index read
    struct RecordingStore {
        inner: FlatArray,
        visits: RefCell<Vec<u64>>,
    }

    impl PermutationStore for RecordingStore {
        const KIND: ContainerKind = ContainerKind::Array;

        fn with_modulus(p: u64) -> Result<Self, BenchError> {
            Ok(RecordingStore {
                inner: FlatArray::with_modulus(p)?,
                visits: RefCell::new(Vec::new()),
            })
        }

        fn get(&self, index: u64) -> u64 {
            self.visits.borrow_mut().push(index);
            self.inner.get(index)
        }

        fn put(&mut self, index: u64, value: u64) {
            self.inner.put(index, value);
        }
    }

    fn visits<A: AccessPattern, N: NextIndex, const B_LOG: u32>() -> Vec<u64> {
        let mut store = RecordingStore::with_modulus(P).unwrap();
        build_permutation(&mut store, A::KIND, P).unwrap();
        let result = traverse_one_trial::<RecordingStore, A, N, B_LOG>(&store, P);
        assert_eq!(result.loop_sum, SUM_1_TO_946);
        store.visits.into_inner()
    }

    #[test]
    fn sequential_sum_matches_closed_form() {
        let result = test_data_structure(&config(
            ContainerKind::Array,
            PatternKind::Sequential,
            NextIndexMode::CalculateNext,
            0,
            1,
        ))
        .unwrap();
        assert_eq!(result.loop_sum, SUM_1_TO_946);
        assert!(result.ns_per_access > 0.0);
    }

    #[test]
    fn every_combination_produces_the_same_checksum() {
        for container in ContainerKind::ALL {
            for pattern in PatternKind::ALL {
                for next_index in NextIndexMode::ALL {
                    for block_log in 0..=4 {
                        let cfg = config(container, pattern, next_index, block_log, 2);
                        let result = test_data_structure(&cfg).unwrap();
                        assert_eq!(result.loop_sum, SUM_1_TO_946, "{cfg:?}");
                        assert!(result.ns_per_access > 0.0, "{cfg:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn unrolling_preserves_traversal_order() {
        let reference = visits::<Cycle, ReadNext, 0>();
        assert_eq!(reference.len(), (P - 1) as usize);
        assert_eq!(reference[..4], [1, 2, 4, 8]);
        assert_eq!(visits::<Cycle, ReadNext, 1>(), reference);
        assert_eq!(visits::<Cycle, ReadNext, 2>(), reference);
        assert_eq!(visits::<Cycle, ReadNext, 3>(), reference);
        // 946 = 59 * 16 + 2, so the remainder loop runs too
        assert_eq!(visits::<Cycle, ReadNext, 4>(), reference);
    }

    #[test]
    fn read_next_follows_the_same_path_as_calculate_next() {
        assert_eq!(
            visits::<LongStride, ReadNext, 2>(),
            visits::<LongStride, CalculateNext, 2>()
        );
        assert_eq!(
            visits::<MediumStride, ReadNext, 0>(),
            visits::<MediumStride, CalculateNext, 3>()
        );
    }

    #[test]
    fn every_index_is_visited_once() {
        let mut order = visits::<MediumStride, CalculateNext, 1>();
        order.sort_unstable();
        assert_eq!(order, (1..P).collect::<Vec<_>>());
    }

    #[test]
    fn repeated_trials_keep_the_checksum() {
        let mut store = HashedMap::with_modulus(P).unwrap();
        build_permutation(&mut store, PatternKind::Cycle, P).unwrap();
        let result = traverse::<HashedMap, Cycle, ReadNext, 2>(&store, P, 10).unwrap();
        assert_eq!(result.loop_sum, SUM_1_TO_946);
    }

    #[test]
    fn unsupported_block_log_is_rejected() {
        let cfg = config(ContainerKind::Vector, PatternKind::Cycle, NextIndexMode::ReadNext, 5, 1);
        assert!(matches!(
            test_data_structure(&cfg),
            Err(BenchError::Configuration(_))
        ));
    }

    #[test]
    fn non_full_cycle_modulus_is_rejected() {
        let mut cfg = config(ContainerKind::Array, PatternKind::Cycle, NextIndexMode::CalculateNext, 0, 1);
        cfg.p = 1023;
        assert!(matches!(
            test_data_structure(&cfg),
            Err(BenchError::Configuration(_))
        ));
    }
}
