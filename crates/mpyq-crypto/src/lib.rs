//! Hashing primitives for MPYQ resource containers
//!
//! This crate provides the two hash functions the container format relies on:
//!
//! - **Name hashing**: the MPQ string hash over a precomputed dispersion
//!   table, producing the `(hash_a, hash_b)` pair that addresses an entry
//! - **Content digests**: MD5 of a file's bytes, stored as lowercase hex in
//!   each entry and compared between packing runs to detect changes
//!
//! Neither is used for security. The name hash only spreads names for lookup
//! and collisions are an accepted risk.
//!
//! # Examples
//!
//! ```
//! use mpyq_crypto::{ContentDigest, CryptTable};
//!
//! let table = CryptTable::new();
//! let key = table.name_hash("sub/b.txt");
//! println!("lookup key: {key}");
//!
//! let digest = ContentDigest::from_data(b"world");
//! assert_eq!(digest.to_hex(), "7d793037a0760186574b0282f2f435e7");
//! ```

#![warn(missing_docs)]

pub mod digest;
pub mod hash;

pub use digest::ContentDigest;
pub use hash::{CryptTable, HashKind, NameHash};
