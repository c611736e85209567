//! Memory-level parallelism detective: pointer chasing over permutation cycles
//!
//! Usage: `mlp_detective [--core ID] [--no-priority] [BATCH_FILE]`. Without a batch file only
//! the CSV header is printed. Each batch line reads
//! `container{a,v,m,u} pattern{c,s,m,l} nextIndex{c,r} sizeExp[13:28] blockLog[0:4] trials`,
//! e.g. `a s r 13 0 5`.
use mlp_detective_rs::batch::run_cli;
use mlp_detective_rs::traversal::PermutationBench;
use std::process::ExitCode;

// use faster/smaller `mimalloc` allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> ExitCode {
    run_cli(PermutationBench::default())
}
