//! End-to-end batch runs through in-memory readers and writers.
use mlp_detective_rs::batch::{Benchmark, run_batch};
use mlp_detective_rs::config::TraversalConfig;
use mlp_detective_rs::error::BenchError;
use mlp_detective_rs::mark::{MarkBench, MarkConfig};
use mlp_detective_rs::report::{BenchResult, header_line};
use mlp_detective_rs::sweep::{SweepBench, SweepConfig};
use mlp_detective_rs::traversal::PermutationBench;
use mlp_detective_rs::two_level::{TwoLevelBench, TwoLevelConfig};
use std::io::Cursor;

fn run<B: Benchmark>(bench: &B, input: &str) -> Result<Vec<String>, BenchError> {
    let mut out = Vec::new();
    let rows = run_batch(bench, Cursor::new(input), &mut out)?;
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    assert_eq!(lines.len(), rows);
    Ok(lines)
}

fn field_count(line: &str) -> usize {
    line.split(',').count()
}

#[test]
fn headers_match_documented_schemas() {
    assert_eq!(
        header_line::<TraversalConfig>(),
        "HW10,pLog,totalKB,p,containerFamily,pattern,nextIndex,blockLog,trials,loopSum,nsPerAccess"
    );
    assert_eq!(
        header_line::<TwoLevelConfig>(),
        "HW10,innerArrayBytes,innerTotalAccesses,outerArrayBytes,outerTotalAccesses,totalKB,enablePrefetch,loopSum,nsPerAccess"
    );
    assert_eq!(
        header_line::<MarkConfig>(),
        "HW10,totalKB,numNodes,numNeighbors,numRoots,trials,prefetchDistance,loopSum,nsPerAccess"
    );
    assert_eq!(
        header_line::<SweepConfig>(),
        "HW10,expBlockBytes,totalKB,trials,prefetchDistanceInBytes,loopSum,nsPerAccess"
    );
}

#[test]
fn reference_line_produces_one_row() {
    let rows = run(&PermutationBench::default(), "a s r 13 0 5\n").unwrap();
    assert_eq!(rows.len(), 1);
    let fields: Vec<&str> = rows[0].split(',').collect();
    assert_eq!(fields.len(), 11);
    assert_eq!(fields.len(), field_count(&header_line::<TraversalConfig>()));
    assert_eq!(fields[0], "HW10");
    assert_eq!(fields[1], "10");
    assert_eq!(fields[3], "947");
    assert_eq!(fields[4..9], ["Array", "Sequential", "ReadNext", "0", "5"]);
    assert_eq!(fields[9], (947u64 * 946 / 2).to_string());
    let ns: f64 = fields[10].parse().unwrap();
    assert!(ns > 0.0);
}

#[test]
fn malformed_lines_are_skipped_without_stopping() {
    let input = "# container pattern next size block trials\n\
                 \n\
                 a s r 13 0\n\
                 a s r 13 0 5\n\
                 q s r 13 0 5\n\
                 v c c 14 2 2\n\
                 u l r 13 4 1 extra\n\
                 m m c 13 3 1";
    let rows = run(&PermutationBench::default(), input).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].contains(",Array,Sequential,ReadNext,"));
    assert!(rows[1].contains(",Vector,Cycle,CalculateNext,"));
    assert!(rows[1].contains(&format!(",{},", 2029u64 * 2028 / 2)));
    assert!(rows[2].contains(",Map,MediumStride,CalculateNext,"));
}

#[test]
fn every_container_reports_the_same_checksum() {
    let input = "a c r 13 1 2\nv c r 13 1 2\nm c r 13 1 2\nu c r 13 1 2\n";
    let rows = run(&PermutationBench::default(), input).unwrap();
    assert_eq!(rows.len(), 4);
    let sums: Vec<&str> = rows.iter().map(|row| row.split(',').nth(9).unwrap()).collect();
    assert!(sums.iter().all(|&sum| sum == "447931"));
}

/// Fails on demand to exercise the runner's error policy
struct FlakyBench;

struct FlakyConfig(u64);

impl mlp_detective_rs::report::CsvRow for FlakyConfig {
    fn header() -> String {
        "HW10,id".to_string()
    }

    fn to_row(&self) -> String {
        format!("HW10,{}", self.0)
    }
}

impl Benchmark for FlakyBench {
    type Config = FlakyConfig;

    fn parse_line(&self, line: &str) -> Result<FlakyConfig, BenchError> {
        line.trim()
            .parse()
            .map(FlakyConfig)
            .map_err(|_| BenchError::Configuration(line.to_string()))
    }

    fn run(&self, config: &FlakyConfig) -> Result<BenchResult, BenchError> {
        match config.0 {
            13 => Err(BenchError::Configuration("unlucky".to_string())),
            99 => Err(BenchError::Consistency {
                expected: 1,
                observed: 2,
                trial: 1,
            }),
            id => Ok(BenchResult {
                loop_sum: id,
                ns_per_access: 1.0,
            }),
        }
    }
}

#[test]
fn configuration_errors_skip_but_consistency_errors_abort() {
    let mut out = Vec::new();
    let err = run_batch(&FlakyBench, Cursor::new("1\n13\n2\n99\n3\n"), &mut out).unwrap_err();
    assert!(matches!(err, BenchError::Consistency { .. }));
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text, "HW10,1,1,1.000000\nHW10,2,2,1.000000\n");
}

#[test]
fn two_level_rows() {
    let rows = run(&TwoLevelBench::default(), "16 20000 10 50 0 2\n16 20000 10 50 1 2\nbad\n").unwrap();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(field_count(row), field_count(&header_line::<TwoLevelConfig>()));
        assert!(row.starts_with("HW10,856,50,488,400,50,"));
    }
    let sum = |row: &String| row.split(',').nth(7).unwrap().to_string();
    assert_eq!(sum(&rows[0]), sum(&rows[1]));
}

#[test]
fn mark_rows() {
    let rows = run(&MarkBench::default(), "4096 4 32 3 0\n4096 4 32 3 4\n").unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("HW10,256,4096,4,32,3,0,"));
    assert_eq!(field_count(&rows[1]), field_count(&header_line::<MarkConfig>()));
}

#[test]
fn sweep_rows() {
    let rows = run(&SweepBench::default(), "64 17 2 0\n\n64 17 2 128\n").unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("HW10,64,128,2,0,"));
    assert!(rows[1].starts_with("HW10,64,128,2,128,"));
    assert_eq!(
        rows[0].split(',').nth(5),
        rows[1].split(',').nth(5),
        "prefetching must not change the checksum"
    );
}
