//! Result model and CSV rows.
use crate::error::BenchError;
use log::debug;

/// A configuration or result that prints as a fixed run of comma-separated fields
pub trait CsvRow {
    /// Column names, in the same order as [`CsvRow::to_row`]
    fn header() -> String;

    fn to_row(&self) -> String;
}

/// Outcome of one configuration: checksum plus best observed time per access
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchResult {
    pub loop_sum: u64,
    pub ns_per_access: f64,
}

impl BenchResult {
    /// Time per access from a raw elapsed duration. Never reports zero, a sub-nanosecond walk
    /// counts as one nanosecond.
    pub fn from_elapsed(loop_sum: u64, elapsed: std::time::Duration, accesses: u64) -> Self {
        let nanos = elapsed.as_nanos().max(1) as f64;
        BenchResult {
            loop_sum,
            ns_per_access: nanos / accesses.max(1) as f64,
        }
    }
}

impl CsvRow for BenchResult {
    fn header() -> String {
        "loopSum,nsPerAccess".to_string()
    }

    fn to_row(&self) -> String {
        format!("{},{:.6}", self.loop_sum, self.ns_per_access)
    }
}

/// Run `trials` timed repetitions and keep the fastest.
///
/// The checksum of the first trial is the reference, every later trial must reproduce it or the
/// whole run fails with [`BenchError::Consistency`].
pub fn best_of<F>(trials: u64, mut run_trial: F) -> Result<BenchResult, BenchError>
where
    F: FnMut() -> Result<BenchResult, BenchError>,
{
    if trials == 0 {
        return Err(BenchError::Configuration("at least one trial is required".to_string()));
    }

    let mut best = run_trial()?;
    debug!("trial 0: loopSum {} {:.3} ns/access", best.loop_sum, best.ns_per_access);
    for trial in 1..trials {
        let result = run_trial()?;
        debug!(
            "trial {}: loopSum {} {:.3} ns/access",
            trial, result.loop_sum, result.ns_per_access
        );
        if result.loop_sum != best.loop_sum {
            return Err(BenchError::Consistency {
                expected: best.loop_sum,
                observed: result.loop_sum,
                trial,
            });
        }
        best.ns_per_access = best.ns_per_access.min(result.ns_per_access);
    }
    Ok(best)
}

/// Header line combining configuration and result columns
pub fn header_line<C: CsvRow>() -> String {
    format!("{},{}", C::header(), BenchResult::header())
}

pub fn row_line<C: CsvRow>(config: &C, result: &BenchResult) -> String {
    format!("{},{}", config.to_row(), result.to_row())
}
