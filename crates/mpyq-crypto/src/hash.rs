//! Two-key name hashing for container entry lookup
//!
//! Every entry in an MPYQ container is addressed by a pair of 32-bit values
//! computed from its uppercased logical name with the classic MPQ string
//! hash. The two values come from the same routine run against different
//! blocks of a precomputed dispersion table, so a lookup needs both to match.
//!
//! The table and the hash must be bit-identical to the ones used by the
//! packer that produced existing containers; any deviation makes their
//! entries unreachable.
//!
//! # Examples
//!
//! ```
//! use mpyq_crypto::hash::{CryptTable, HashKind};
//!
//! let table = CryptTable::new();
//! let a = table.hash("data/ui/atlas.png", HashKind::A);
//! let b = table.hash("DATA/UI/ATLAS.PNG", HashKind::A);
//! assert_eq!(a, b);
//! ```

use std::fmt;

/// Seed of the linear congruential generator that fills the table
const TABLE_SEED: u32 = 0x0010_0001;

/// Number of table blocks (one per hash kind used by the MPQ family)
const TABLE_BLOCKS: usize = 5;

/// Slots per table block
const BLOCK_SIZE: usize = 0x100;

/// Initial value of the first hash accumulator
const HASH_SEED_1: u32 = 0x7FED_7FED;

/// Initial value of the second hash accumulator
const HASH_SEED_2: u32 = 0xEEEE_EEEE;

/// Which half of the two-key lookup pair to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashKind {
    /// First lookup key, table block 1
    A,
    /// Second lookup key, table block 2
    B,
}

impl HashKind {
    /// Table block used by this hash kind
    pub const fn block(self) -> usize {
        match self {
            Self::A => 1,
            Self::B => 2,
        }
    }
}

/// Both lookup keys of a logical name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameHash {
    /// Hash of kind [`HashKind::A`]
    pub a: u32,
    /// Hash of kind [`HashKind::B`]
    pub b: u32,
}

impl NameHash {
    /// Create from raw values
    pub const fn new(a: u32, b: u32) -> Self {
        Self { a, b }
    }

    /// The pair widened to the 64-bit form stored in entry records
    pub fn as_wide(&self) -> (u64, u64) {
        (u64::from(self.a), u64::from(self.b))
    }
}

impl fmt::Display for NameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}:{:08x}", self.a, self.b)
    }
}

/// Precomputed dispersion table for the name hash
///
/// Build it once with [`CryptTable::new`] and share it by reference with
/// every reader and writer that needs to hash names.
#[derive(Clone)]
pub struct CryptTable {
    slots: Box<[u32; TABLE_BLOCKS * BLOCK_SIZE]>,
}

impl CryptTable {
    /// Generate the table
    pub fn new() -> Self {
        let mut slots = Box::new([0u32; TABLE_BLOCKS * BLOCK_SIZE]);
        let mut seed = TABLE_SEED;

        for i in 0..BLOCK_SIZE {
            let mut index = i;
            for _ in 0..TABLE_BLOCKS {
                seed = (seed * 125 + 3) % 0x002A_AAAB;
                let high = (seed & 0xFFFF) << 16;

                seed = (seed * 125 + 3) % 0x002A_AAAB;
                let low = seed & 0xFFFF;

                slots[index] = high | low;
                index += BLOCK_SIZE;
            }
        }

        Self { slots }
    }

    #[cfg(test)]
    fn slot(&self, index: usize) -> Option<u32> {
        self.slots.get(index).copied()
    }

    /// Hash a logical name
    ///
    /// ASCII letters are uppercased before hashing, so lookups are
    /// case-insensitive for ASCII names. The name is consumed as UTF-8 bytes.
    pub fn hash(&self, name: &str, kind: HashKind) -> u32 {
        let base = kind.block() * BLOCK_SIZE;
        let mut seed1 = HASH_SEED_1;
        let mut seed2 = HASH_SEED_2;

        for byte in name.bytes() {
            let ch = u32::from(byte.to_ascii_uppercase());
            let value = self.slots[base + ch as usize];

            seed1 = value ^ seed1.wrapping_add(seed2);
            seed2 = ch
                .wrapping_add(seed1)
                .wrapping_add(seed2)
                .wrapping_add(seed2 << 5)
                .wrapping_add(3);
        }

        seed1
    }

    /// Compute both lookup keys of a logical name
    pub fn name_hash(&self, name: &str) -> NameHash {
        NameHash::new(self.hash(name, HashKind::A), self.hash(name, HashKind::B))
    }
}

impl Default for CryptTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CryptTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptTable")
            .field("slots", &self.slots.len())
            .finish()
    }
}
