//! Sweep over geometrically distributed run lengths
use mlp_detective_rs::batch::run_cli;
use mlp_detective_rs::sweep::SweepBench;
use std::process::ExitCode;

// use faster/smaller `mimalloc` allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> ExitCode {
    run_cli(SweepBench::default())
}
