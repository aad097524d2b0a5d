pub mod prelude {
    pub use super::IndexSet;
}

const BLOCK_BITS: usize = 64;

/// Dense bitset over small non-negative indices.
///
/// Two sets compare equal iff they hold the same indices, regardless of the
/// order they were added in: `clone_with` sizes the block vector to
/// `max(parent, index)`, so the representation depends only on the largest
/// member ever inserted along the derivation chain.
#[derive(Clone)]
#[derive(Debug, Default)]
#[derive(PartialEq, Eq, Hash)]
pub struct IndexSet {
    blocks: Vec<u64>,
}

impl IndexSet {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Derive a new set by cloning an existing one and adding an index.
    pub fn clone_with(&self, index: usize) -> Self {
        let mut blocks = vec![0; usize::max(self.blocks.len(), index / BLOCK_BITS + 1)];
        blocks[..self.blocks.len()].copy_from_slice(&self.blocks);

        let mut set = Self { blocks };
        set.set_bit(index);
        set
    }

    pub fn add(&mut self, index: usize) {
        if index / BLOCK_BITS >= self.blocks.len() {
            self.blocks.resize(index / BLOCK_BITS + 1, 0);
        }
        self.set_bit(index);
    }

    pub fn contains(&self, index: usize) -> bool {
        match self.blocks.get(index / BLOCK_BITS) {
            Some(block) => block & (1u64 << (index % BLOCK_BITS)) != 0,
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.iter().map(|block| block.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|block| *block == 0)
    }

    pub fn is_subset_of(&self, other: &IndexSet) -> bool {
        self.blocks.iter().enumerate().all(|(i, block)| {
            *block == 0 || other.blocks.get(i).is_some_and(|b| block & b == *block)
        })
    }

    /// Iterate the members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.blocks.len() * BLOCK_BITS).filter(|index| self.contains(*index))
    }

    fn set_bit(&mut self, index: usize) {
        self.blocks[index / BLOCK_BITS] |= 1u64 << (index % BLOCK_BITS);
    }
}

impl std::fmt::Display for IndexSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, index) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{index}")?;
        }
        write!(f, "}}")
    }
}

// =============================================================================

#[test]
fn membership_and_size() {
    let mut set = IndexSet::new();
    assert!(set.is_empty());

    set.add(3);
    set.add(70);
    assert!(set.contains(3));
    assert!(set.contains(70));
    assert!(!set.contains(4));
    assert!(!set.contains(500));
    assert_eq!(set.len(), 2);
}

#[test]
fn equality_is_order_independent() {
    let empty = IndexSet::new();
    let a = empty.clone_with(2).clone_with(65);
    let b = empty.clone_with(65).clone_with(2);
    assert_eq!(a, b);

    use std::hash::{BuildHasher, RandomState};
    let hasher = RandomState::new();
    assert_eq!(hasher.hash_one(&a), hasher.hash_one(&b));
}

#[test]
fn clone_with_leaves_source_untouched() {
    let base = IndexSet::new().clone_with(1);
    let derived = base.clone_with(9);
    assert!(!base.contains(9));
    assert!(derived.contains(1));
    assert!(derived.contains(9));
}

#[test]
fn subset_check() {
    let empty = IndexSet::new();
    let small = empty.clone_with(1).clone_with(2);
    let large = small.clone_with(80);
    assert!(small.is_subset_of(&large));
    assert!(!large.is_subset_of(&small));
    assert!(empty.is_subset_of(&small));
}

#[test]
fn iterates_in_ascending_order() {
    let set = IndexSet::new().clone_with(64).clone_with(0).clone_with(7);
    let members: Vec<usize> = set.iter().collect();
    assert_eq!(members, vec![0, 7, 64]);
    assert_eq!(set.to_string(), "{0, 7, 64}");
}
