//! Worklist-driven graph marking
use mlp_detective_rs::batch::run_cli;
use mlp_detective_rs::mark::MarkBench;
use std::process::ExitCode;

// use faster/smaller `mimalloc` allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> ExitCode {
    run_cli(MarkBench::default())
}
