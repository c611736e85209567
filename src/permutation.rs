use crate::error::BenchError;
use crate::pattern::PatternKind;
use crate::store::PermutationStore;
use log::debug;

/// Materialize the successor table of `pattern` modulo `p` into `store`.
///
/// Starting from index 1, writes `store[index] = advance(index)` for `p - 1` steps. Fails with
/// [`BenchError::Configuration`] when `p` is too small for the pattern or the walk returns to 1
/// early (the modulus isn't a full-cycle generator for this pattern).
pub fn build_permutation<S: PermutationStore>(
    store: &mut S,
    pattern: PatternKind,
    p: u64,
) -> Result<(), BenchError> {
    if p < pattern.min_modulus() {
        return Err(BenchError::Configuration(format!(
            "modulus {} too small for {} (needs at least {})",
            p,
            pattern,
            pattern.min_modulus()
        )));
    }

    let mut index = 1u64;
    for step in 1..p {
        let next = pattern.advance(index, p);
        store.put(index, next);
        index = next;
        if index == 1 && step != p - 1 {
            return Err(BenchError::Configuration(format!(
                "{pattern} modulo {p} closes after {step} steps instead of {}",
                p - 1
            )));
        }
    }
    if index != 1 {
        return Err(BenchError::Configuration(format!(
            "{pattern} modulo {p} doesn't return to 1"
        )));
    }

    debug!("Built {} permutation over {} indices in {}", pattern, p - 1, S::KIND);
    Ok(())
}
