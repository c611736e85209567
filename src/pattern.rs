//! # Access patterns
//!
//! Each pattern is a stateless index-advance rule over the index space `1..P` (P prime). The
//! rules are bijections on that space; whether they form a *single* `P-1` cycle depends on the
//! modulus, which is why primes come from a validated [`crate::primes::PrimeTable`].
//!
//! Patterns and next-index rules exist twice: as plain enums (parsed from batch lines, printed
//! in CSV rows) and as zero-sized marker types implementing [`AccessPattern`] / [`NextIndex`],
//! which the traversal loop is monomorphized over so the advance rule inlines into the hot loop.
use std::fmt;

/// Stride of [`MediumStride`], roughly one 64-byte cache line of `u64`s
pub const MEDIUM_STRIDE: u64 = 7;
/// Stride of [`LongStride`], roughly one 4 KiB page of `u64`s
pub const LONG_STRIDE: u64 = 509;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// `idx * 2 mod P`, defeats stride prefetchers
    Cycle,
    /// `idx + 1`, prefetcher-friendly baseline
    Sequential,
    /// `idx + 7`, every cache line
    MediumStride,
    /// `idx + 509`, every page
    LongStride,
}

impl PatternKind {
    pub const ALL: [PatternKind; 4] = [
        PatternKind::Cycle,
        PatternKind::Sequential,
        PatternKind::MediumStride,
        PatternKind::LongStride,
    ];

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'c' => Some(PatternKind::Cycle),
            's' => Some(PatternKind::Sequential),
            'm' => Some(PatternKind::MediumStride),
            'l' => Some(PatternKind::LongStride),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PatternKind::Cycle => "Cycle",
            PatternKind::Sequential => "Sequential",
            PatternKind::MediumStride => "MediumStride",
            PatternKind::LongStride => "LongStride",
        }
    }

    /// Runtime-dispatched advance, used outside the timed region
    #[inline]
    pub fn advance(self, index: u64, p: u64) -> u64 {
        match self {
            PatternKind::Cycle => Cycle::advance(index, p),
            PatternKind::Sequential => Sequential::advance(index, p),
            PatternKind::MediumStride => MediumStride::advance(index, p),
            PatternKind::LongStride => LongStride::advance(index, p),
        }
    }

    /// Smallest modulus for which the advance rule stays inside `1..P`
    pub fn min_modulus(self) -> u64 {
        match self {
            PatternKind::Cycle => 3,
            PatternKind::Sequential => 2,
            PatternKind::MediumStride => MEDIUM_STRIDE + 1,
            PatternKind::LongStride => LONG_STRIDE + 1,
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compile-time selected index-advance rule
pub trait AccessPattern {
    const KIND: PatternKind;

    fn advance(index: u64, p: u64) -> u64;
}

pub struct Cycle;
pub struct Sequential;
pub struct MediumStride;
pub struct LongStride;

impl AccessPattern for Cycle {
    const KIND: PatternKind = PatternKind::Cycle;

    #[inline(always)]
    fn advance(index: u64, p: u64) -> u64 {
        let next = index << 1;
        if next >= p { next - p } else { next }
    }
}

impl AccessPattern for Sequential {
    const KIND: PatternKind = PatternKind::Sequential;

    #[inline(always)]
    fn advance(index: u64, p: u64) -> u64 {
        if index >= p - 1 { 1 } else { index + 1 }
    }
}

impl AccessPattern for MediumStride {
    const KIND: PatternKind = PatternKind::MediumStride;

    #[inline(always)]
    fn advance(index: u64, p: u64) -> u64 {
        let next = index + MEDIUM_STRIDE;
        if next >= p { next - (p - 1) } else { next }
    }
}

impl AccessPattern for LongStride {
    const KIND: PatternKind = PatternKind::LongStride;

    #[inline(always)]
    fn advance(index: u64, p: u64) -> u64 {
        let next = index + LONG_STRIDE;
        if next >= p { next - (p - 1) } else { next }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NextIndexMode {
    /// Recompute the successor with the pattern's advance rule
    CalculateNext,
    /// The value just read from the store *is* the successor (true pointer chasing)
    ReadNext,
}

impl NextIndexMode {
    pub const ALL: [NextIndexMode; 2] = [NextIndexMode::CalculateNext, NextIndexMode::ReadNext];

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'c' => Some(NextIndexMode::CalculateNext),
            'r' => Some(NextIndexMode::ReadNext),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NextIndexMode::CalculateNext => "CalculateNext",
            NextIndexMode::ReadNext => "ReadNext",
        }
    }
}

impl fmt::Display for NextIndexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compile-time selected way of obtaining the next index
pub trait NextIndex {
    const MODE: NextIndexMode;

    /// `value` is what was just read from the store at `index`
    fn next<A: AccessPattern>(index: u64, value: u64, p: u64) -> u64;
}

pub struct CalculateNext;
pub struct ReadNext;

impl NextIndex for CalculateNext {
    const MODE: NextIndexMode = NextIndexMode::CalculateNext;

    #[inline(always)]
    fn next<A: AccessPattern>(index: u64, _value: u64, p: u64) -> u64 {
        A::advance(index, p)
    }
}

impl NextIndex for ReadNext {
    const MODE: NextIndexMode = NextIndexMode::ReadNext;

    #[inline(always)]
    fn next<A: AccessPattern>(_index: u64, value: u64, _p: u64) -> u64 {
        value
    }
}
