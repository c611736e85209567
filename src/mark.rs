//! # Mark phase
//!
//! Worklist-driven marking over a random graph, the access pattern of a tracing garbage
//! collector's mark phase. Nodes are one cache line each. The first visit of a node pushes all of
//! its neighbors, later visits only bump its predecessor count. Every pop counts as one access.
//!
//! The worklist is an `rtrb` ring buffer sized for the worst case before timing starts, so the
//! timed loop never allocates.
use crate::batch::Benchmark;
use crate::config::{bound, parse_u64, split_fields};
use crate::error::BenchError;
use crate::format_size;
use crate::platform::prefetch_read;
use crate::report::{BenchResult, CsvRow, best_of};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rtrb::RingBuffer;
use std::hint::black_box;
use std::time::Instant;

pub const MAX_NEIGHBORS: usize = 15;
pub const MAX_NODES: u64 = 1 << 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkConfig {
    pub num_nodes: u64,
    pub num_neighbors: u64,
    pub num_roots: u64,
    pub trials: u64,
    /// How many worklist entries ahead to prefetch, 0 disables prefetching
    pub prefetch_distance: u64,
}

impl MarkConfig {
    pub const FIELDS: usize = 5;

    /// Parse `numNodes numNeighbors numRoots trials prefetchDistance`
    pub fn parse_line(line: &str) -> Result<Self, BenchError> {
        let fields = split_fields(line, Self::FIELDS)?;
        let num_nodes = bound("numNodes", parse_u64("numNodes", fields[0])?, 1, MAX_NODES);
        let num_neighbors = bound(
            "numNeighbors",
            parse_u64("numNeighbors", fields[1])?,
            1,
            MAX_NEIGHBORS as u64,
        );
        let num_roots = bound("numRoots", parse_u64("numRoots", fields[2])?, 1, num_nodes);
        let trials = bound("trials", parse_u64("trials", fields[3])?, 1, 1000);
        let prefetch_distance = bound(
            "prefetchDistance",
            parse_u64("prefetchDistance", fields[4])?,
            0,
            num_nodes,
        );
        Ok(MarkConfig {
            num_nodes,
            num_neighbors,
            num_roots,
            trials,
            prefetch_distance,
        })
    }

    /// Upper bound on pushes in one trial: every root, plus each node expanding once
    fn worklist_capacity(&self) -> Result<usize, BenchError> {
        self.num_nodes
            .checked_mul(self.num_neighbors)
            .and_then(|pushes| pushes.checked_add(self.num_roots))
            .and_then(|pushes| usize::try_from(pushes).ok())
            .ok_or_else(|| BenchError::Resource("worklist size overflows".to_string()))
    }
}

impl CsvRow for MarkConfig {
    fn header() -> String {
        "HW10,totalKB,numNodes,numNeighbors,numRoots,trials,prefetchDistance".to_string()
    }

    fn to_row(&self) -> String {
        format!(
            "HW10,{},{},{},{},{},{}",
            self.num_nodes / 16,
            self.num_nodes,
            self.num_neighbors,
            self.num_roots,
            self.trials,
            self.prefetch_distance
        )
    }
}

/// One cache line: live predecessor count plus up to [`MAX_NEIGHBORS`] outgoing edges
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
struct Node {
    live_predecessors: u32,
    neighbors: [u32; MAX_NEIGHBORS],
}

fn init(config: &MarkConfig, seed: u64) -> Result<Vec<Node>, BenchError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let num_nodes = config.num_nodes as u32;
    let mut nodes = Vec::new();
    nodes.try_reserve_exact(config.num_nodes as usize)?;
    for _ in 0..config.num_nodes {
        let mut node = Node::default();
        for neighbor in &mut node.neighbors[..config.num_neighbors as usize] {
            *neighbor = rng.random_range(0..num_nodes);
        }
        nodes.push(node);
    }
    Ok(nodes)
}

/// Bounded FIFO worklist of `capacity` node ids.
///
/// `RingBuffer::new` aborts when its allocation fails, so the same amount of memory is reserved
/// (and handed back) first to turn an unaffordable worklist into [`BenchError::Resource`].
fn allocate_worklist(
    capacity: usize,
) -> Result<(rtrb::Producer<u32>, rtrb::Consumer<u32>), BenchError> {
    let mut reservation: Vec<u32> = Vec::new();
    reservation
        .try_reserve_exact(capacity)
        .map_err(|e| BenchError::Resource(format!("worklist of {capacity} entries: {e}")))?;
    drop(reservation);
    Ok(RingBuffer::<u32>::new(capacity))
}

/// Peek `distance` entries past the worklist head and prefetch that node
#[inline(always)]
fn prefetch_ahead(consumer: &mut rtrb::Consumer<u32>, nodes: &[Node], distance: usize) {
    // an uncommitted chunk leaves the entries in the queue
    if let Ok(chunk) = consumer.read_chunk(distance + 1) {
        let (first, second) = chunk.as_slices();
        let ahead = first
            .get(distance)
            .or_else(|| second.get(distance - first.len()));
        if let Some(&id) = ahead {
            prefetch_read(nodes.as_ptr().wrapping_add(id as usize));
        }
    }
}

pub struct MarkBench {
    graph_seed: u64,
    root_seed: u64,
}

impl MarkBench {
    pub fn new(graph_seed: u64, root_seed: u64) -> Self {
        MarkBench {
            graph_seed,
            root_seed,
        }
    }

    pub fn test_prefetch_distance(&self, config: &MarkConfig) -> Result<BenchResult, BenchError> {
        info!(
            "Mark: {} nodes ({}), {} neighbors, {} roots, prefetch distance {}",
            config.num_nodes,
            format_size(config.num_nodes * std::mem::size_of::<Node>() as u64),
            config.num_neighbors,
            config.num_roots,
            config.prefetch_distance
        );
        let mut nodes = init(config, self.graph_seed)?;
        let (mut producer, mut consumer) = allocate_worklist(config.worklist_capacity()?)?;
        let num_nodes = config.num_nodes as u32;
        let num_neighbors = config.num_neighbors as usize;
        let distance = config.prefetch_distance as usize;

        best_of(config.trials, || {
            for node in nodes.iter_mut() {
                node.live_predecessors = 0;
            }
            // same roots every trial, so every trial marks the same graph
            let mut roots = StdRng::seed_from_u64(self.root_seed);
            let mut overflowed = false;
            let mut loop_sum = 0u64;

            let start = Instant::now();
            for _ in 0..config.num_roots {
                overflowed |= producer.push(roots.random_range(0..num_nodes)).is_err();
            }
            loop {
                if distance > 0 {
                    prefetch_ahead(&mut consumer, &nodes, distance);
                }
                let Ok(id) = consumer.pop() else { break };
                let node = &mut nodes[id as usize];
                if node.live_predecessors == 0 {
                    for &neighbor in &node.neighbors[..num_neighbors] {
                        overflowed |= producer.push(neighbor).is_err();
                    }
                }
                node.live_predecessors += 1;
                loop_sum += 1;
            }
            let elapsed = start.elapsed();

            if overflowed {
                return Err(BenchError::Resource("mark worklist overflowed".to_string()));
            }
            Ok(BenchResult::from_elapsed(black_box(loop_sum), elapsed, loop_sum))
        })
    }
}

impl Default for MarkBench {
    fn default() -> Self {
        Self::new(0x5EED_6AF4, 0x0000_F00D)
    }
}

impl Benchmark for MarkBench {
    type Config = MarkConfig;

    fn parse_line(&self, line: &str) -> Result<MarkConfig, BenchError> {
        MarkConfig::parse_line(line)
    }

    fn run(&self, config: &MarkConfig) -> Result<BenchResult, BenchError> {
        self.test_prefetch_distance(config)
    }
}
