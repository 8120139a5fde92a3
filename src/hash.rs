//! Key hashing seam.
//!
//! The engine treats its hash function as an external collaborator with
//! the contract `hash(bytes, seed) -> u32`: deterministic, seed-dependent,
//! with good avalanche across the low bits used as the bucket mask.
//! [`SipKeyHash`] is the default; tables built with distinct seeds see
//! uncorrelated collision patterns.

use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

/// Default hash seed, mixed into every key hash.
pub const DEFAULT_SEED: u32 = 0x2007_1023;

/// Maps key bytes to a 32-bit value used for bucket selection.
pub trait KeyHasher {
    fn hash(&self, key: &[u8], seed: u32) -> u32;
}

/// Seed-mixing SipHash over the key bytes.
///
/// `DefaultHasher::new()` uses fixed keys, so the result depends only on
/// the key bytes and the seed. The high word is folded into the low word
/// so that small bucket masks still see the full 64-bit avalanche.
#[derive(Debug, Default, Clone, Copy)]
pub struct SipKeyHash;

impl KeyHasher for SipKeyHash {
    fn hash(&self, key: &[u8], seed: u32) -> u32 {
        let mut h = DefaultHasher::new();
        h.write_u32(seed);
        h.write(key);
        let x = h.finish();
        (x ^ (x >> 32)) as u32
    }
}
