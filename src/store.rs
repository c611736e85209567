//! # Storage backends
//!
//! Four interchangeable homes for a permutation table. Each one is accessed through
//! [`PermutationStore`], and the traversal loop is monomorphized per backend, so what gets timed
//! is the backend's own lookup cost: a bounds-checked slice index, a B-tree descent or a hash
//! probe. Nothing here caches lookups between calls.
//!
//! Indices live in `1..P`. Array backends allocate `P` slots and leave slot 0 unused.
use crate::error::BenchError;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Fixed-size boxed slice, allocated once
    Array,
    /// Resizable `Vec`, grown to size before the walk
    Vector,
    /// Ordered `BTreeMap`
    Map,
    /// Hashed `HashMap`
    UnorderedMap,
}

impl ContainerKind {
    pub const ALL: [ContainerKind; 4] = [
        ContainerKind::Array,
        ContainerKind::Vector,
        ContainerKind::Map,
        ContainerKind::UnorderedMap,
    ];

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'a' => Some(ContainerKind::Array),
            'v' => Some(ContainerKind::Vector),
            'm' => Some(ContainerKind::Map),
            'u' => Some(ContainerKind::UnorderedMap),
            _ => None,
        }
    }

    /// Name as printed in the `containerFamily` CSV column
    pub fn name(self) -> &'static str {
        match self {
            ContainerKind::Array => "Array",
            ContainerKind::Vector => "Vector",
            ContainerKind::Map => "Map",
            ContainerKind::UnorderedMap => "Unordered_map",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Common capability set of a permutation backing store
pub trait PermutationStore: Sized {
    const KIND: ContainerKind;

    /// Allocate (or reserve) room for indices `1..p`
    fn with_modulus(p: u64) -> Result<Self, BenchError>;

    /// Value stored at `index`, 0 if nothing was ever put there
    fn get(&self, index: u64) -> u64;

    fn put(&mut self, index: u64, value: u64);

    /// Give the backing memory back. Dropping does the same; this marks the point explicitly.
    fn release(self) {
        drop(self);
    }
}

/// Flat indexable array, allocated in a single shot and never resized
pub struct FlatArray {
    data: Box<[u64]>,
}

impl FlatArray {
    /// Start of the slot array, for issuing prefetch hints
    pub fn as_ptr(&self) -> *const u64 {
        self.data.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copy into a fresh allocation, reporting allocation failure instead of aborting
    pub fn try_clone(&self) -> Result<Self, BenchError> {
        let mut data = Vec::new();
        data.try_reserve_exact(self.data.len())?;
        data.extend_from_slice(&self.data);
        Ok(FlatArray {
            data: data.into_boxed_slice(),
        })
    }
}

impl PermutationStore for FlatArray {
    const KIND: ContainerKind = ContainerKind::Array;

    fn with_modulus(p: u64) -> Result<Self, BenchError> {
        let len = slot_count(p)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize(len, 0u64);
        Ok(FlatArray {
            data: data.into_boxed_slice(),
        })
    }

    #[inline(always)]
    fn get(&self, index: u64) -> u64 {
        self.data[index as usize]
    }

    #[inline(always)]
    fn put(&mut self, index: u64, value: u64) {
        self.data[index as usize] = value;
    }
}

/// Resizable array, reserved up front and grown element by element to `P` slots
pub struct GrowableArray {
    data: Vec<u64>,
}

impl PermutationStore for GrowableArray {
    const KIND: ContainerKind = ContainerKind::Vector;

    fn with_modulus(p: u64) -> Result<Self, BenchError> {
        let len = slot_count(p)?;
        let mut data = Vec::new();
        data.try_reserve(len)?;
        data.extend(std::iter::repeat_n(0u64, len));
        Ok(GrowableArray { data })
    }

    #[inline(always)]
    fn get(&self, index: u64) -> u64 {
        self.data[index as usize]
    }

    #[inline(always)]
    fn put(&mut self, index: u64, value: u64) {
        let slot = index as usize;
        if slot >= self.data.len() {
            self.data.resize(slot + 1, 0);
        }
        self.data[slot] = value;
    }
}

/// Ordered associative map, O(log P) per access
#[derive(Default)]
pub struct OrderedMap {
    data: BTreeMap<u64, u64>,
}

impl PermutationStore for OrderedMap {
    const KIND: ContainerKind = ContainerKind::Map;

    fn with_modulus(p: u64) -> Result<Self, BenchError> {
        slot_count(p)?;
        Ok(OrderedMap::default())
    }

    #[inline(always)]
    fn get(&self, index: u64) -> u64 {
        self.data.get(&index).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn put(&mut self, index: u64, value: u64) {
        self.data.insert(index, value);
    }
}

/// Hashed associative map, O(1) expected per access
#[derive(Default)]
pub struct HashedMap {
    data: HashMap<u64, u64>,
}

impl PermutationStore for HashedMap {
    const KIND: ContainerKind = ContainerKind::UnorderedMap;

    fn with_modulus(p: u64) -> Result<Self, BenchError> {
        let len = slot_count(p)?;
        let mut data = HashMap::new();
        data.try_reserve(len)?;
        Ok(HashedMap { data })
    }

    #[inline(always)]
    fn get(&self, index: u64) -> u64 {
        self.data.get(&index).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn put(&mut self, index: u64, value: u64) {
        self.data.insert(index, value);
    }
}

fn slot_count(p: u64) -> Result<usize, BenchError> {
    if p < 2 {
        return Err(BenchError::Configuration(format!(
            "modulus {p} leaves no indices to store"
        )));
    }
    usize::try_from(p).map_err(|_| BenchError::Resource(format!("{p} slots exceed address space")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise<S: PermutationStore>() {
        let mut store = S::with_modulus(947).unwrap();
        assert_eq!(store.get(1), 0);
        store.put(1, 2);
        store.put(946, 1);
        assert_eq!(store.get(1), 2);
        assert_eq!(store.get(946), 1);
        store.put(1, 5);
        assert_eq!(store.get(1), 5);
        assert_eq!(store.get(500), 0);
        store.release();
    }

    #[test]
    fn all_backends_get_what_was_put() {
        exercise::<FlatArray>();
        exercise::<GrowableArray>();
        exercise::<OrderedMap>();
        exercise::<HashedMap>();
    }

    #[test]
    fn degenerate_modulus_is_rejected() {
        assert!(matches!(
            FlatArray::with_modulus(1),
            Err(BenchError::Configuration(_))
        ));
        assert!(matches!(
            HashedMap::with_modulus(0),
            Err(BenchError::Configuration(_))
        ));
    }

    #[test]
    fn array_backends_have_one_slot_per_residue() {
        let mut store = FlatArray::with_modulus(2029).unwrap();
        assert_eq!(store.len(), 2029);
        assert!(!store.is_empty());

        store.put(3, 6);
        let copy = store.try_clone().unwrap();
        store.put(3, 7);
        assert_eq!(copy.get(3), 6);
        assert_eq!(copy.len(), 2029);
    }

    #[test]
    fn container_chars_round_trip_names() {
        assert_eq!(ContainerKind::from_char('a'), Some(ContainerKind::Array));
        assert_eq!(ContainerKind::from_char('u').unwrap().name(), "Unordered_map");
        assert_eq!(ContainerKind::from_char('z'), None);
        assert_eq!(FlatArray::KIND, ContainerKind::Array);
        assert_eq!(HashedMap::KIND, ContainerKind::UnorderedMap);
    }
}
