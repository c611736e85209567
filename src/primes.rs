//! Read-only lookup tables of primes validated for full-cycle traversal.
use crate::error::BenchError;
use crate::pattern::PatternKind;
use std::ops::RangeInclusive;

/// Largest full-cycle prime below `2^log` for `log` in `10..=25`, valid for all four patterns
const PERMUTATION_PRIMES: [u64; 16] = [
    947, 2029, 4093, 8179, 16363, 32749, 65371, 131059, 262139, 524269, 1048571, 2097133,
    4194187, 8388587, 16776989, 33554371,
];

/// Largest primes below `2^log` for `log` in `5..=23` on which doubling is a full cycle
const DOUBLING_PRIMES: [u64; 19] = [
    29, 61, 107, 227, 509, 947, 2029, 4093, 8179, 16363, 32749, 65371, 131059, 262139, 524269,
    1048571, 2097133, 4194187, 8388587,
];

/// Primes indexed by log2 of the element count they stand in for
#[derive(Debug, Clone)]
pub struct PrimeTable {
    first_log: u64,
    primes: Vec<u64>,
}

impl PrimeTable {
    pub fn new(first_log: u64, primes: Vec<u64>) -> Self {
        PrimeTable { first_log, primes }
    }

    /// Table used by the permutation traversal, valid for every [`PatternKind`]
    pub fn permutation() -> Self {
        Self::new(10, PERMUTATION_PRIMES.to_vec())
    }

    /// Table used by the two-level traversal, valid for [`PatternKind::Cycle`] only
    pub fn doubling() -> Self {
        Self::new(5, DOUBLING_PRIMES.to_vec())
    }

    pub fn log_range(&self) -> RangeInclusive<u64> {
        self.first_log..=self.first_log + self.primes.len() as u64 - 1
    }

    pub fn lookup(&self, log: u64) -> Result<u64, BenchError> {
        log.checked_sub(self.first_log)
            .and_then(|offset| self.primes.get(offset as usize))
            .copied()
            .ok_or_else(|| {
                BenchError::Configuration(format!(
                    "size exponent {} outside prime table range {:?}",
                    log,
                    self.log_range()
                ))
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.primes
            .iter()
            .enumerate()
            .map(|(offset, &p)| (self.first_log + offset as u64, p))
    }
}

/// Does `pattern` starting at 1 visit all of `1..p` before returning to 1?
///
/// Every pattern's advance rule is a bijection on `1..p`, so the orbit of 1 is a single full
/// cycle exactly when the first return to 1 happens after `p - 1` steps.
pub fn is_full_cycle(pattern: PatternKind, p: u64) -> bool {
    if p < pattern.min_modulus() {
        return false;
    }
    let mut index = 1;
    for step in 1..p {
        index = pattern.advance(index, p);
        if index == 1 {
            return step == p - 1;
        }
    }
    false
}

/// Offline search for the largest odd modulus below `2^log` on which every pattern in
/// `patterns` is a full cycle. Only used to regenerate or check the tables above.
pub fn find_full_cycle_prime(log: u32, patterns: &[PatternKind]) -> Option<u64> {
    let mut candidate = (1u64 << log) - 1;
    while candidate >= 3 {
        if patterns.iter().all(|&pattern| is_full_cycle(pattern, candidate)) {
            return Some(candidate);
        }
        candidate -= 2;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_log() {
        let table = PrimeTable::permutation();
        assert_eq!(table.lookup(10).unwrap(), 947);
        assert_eq!(table.lookup(25).unwrap(), 33554371);
        assert_eq!(table.log_range(), 10..=25);
        assert!(matches!(table.lookup(9), Err(BenchError::Configuration(_))));
        assert!(matches!(table.lookup(26), Err(BenchError::Configuration(_))));
    }

    #[test]
    fn doubling_table_range() {
        let table = PrimeTable::doubling();
        assert_eq!(table.log_range(), 5..=23);
        assert_eq!(table.lookup(5).unwrap(), 29);
        assert_eq!(table.lookup(23).unwrap(), 8388587);
    }

    #[test]
    fn non_full_cycle_moduli_are_detected() {
        // 2 has order 3 modulo 7
        assert!(!is_full_cycle(PatternKind::Cycle, 7));
        // 505 = 5 * 101, doubling can't reach every residue
        assert!(!is_full_cycle(PatternKind::Cycle, 505));
        // 7 divides 28, so the 7-stride splits 1..29 into several cycles
        assert!(!is_full_cycle(PatternKind::MediumStride, 29));
        // too small for the long stride
        assert!(!is_full_cycle(PatternKind::LongStride, 29));
        assert!(is_full_cycle(PatternKind::Cycle, 29));
    }

    #[test]
    fn permutation_table_is_full_cycle_for_every_pattern() {
        let table = PrimeTable::permutation();
        for (log, p) in table.iter().take_while(|&(log, _)| log <= 18) {
            for pattern in PatternKind::ALL {
                assert!(is_full_cycle(pattern, p), "{pattern} on p={p} (log {log})");
            }
        }
    }

    #[test]
    fn doubling_table_is_full_cycle() {
        for (_, p) in PrimeTable::doubling().iter().take_while(|&(log, _)| log <= 18) {
            assert!(is_full_cycle(PatternKind::Cycle, p), "p={p}");
        }
    }

    #[test]
    fn search_reproduces_tables() {
        let table = PrimeTable::permutation();
        for log in 10..=13 {
            assert_eq!(
                find_full_cycle_prime(log, &PatternKind::ALL),
                Some(table.lookup(log as u64).unwrap())
            );
        }
        let doubling = PrimeTable::doubling();
        for log in 5..=9 {
            assert_eq!(
                find_full_cycle_prime(log, &[PatternKind::Cycle]),
                Some(doubling.lookup(log as u64).unwrap())
            );
        }
    }
}
