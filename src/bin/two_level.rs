//! Two-level (outer node / inner array) pointer chasing
use mlp_detective_rs::batch::run_cli;
use mlp_detective_rs::two_level::TwoLevelBench;
use std::process::ExitCode;

// use faster/smaller `mimalloc` allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> ExitCode {
    run_cli(TwoLevelBench::default())
}
