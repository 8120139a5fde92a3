//! chaintable: a single-threaded, fixed-bucket hash table for fixed-size
//! payloads with variable-length byte keys, threaded by one intrusive
//! doubly-linked list that doubles as the O(1) iteration order.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep the pointer-heavy bucket/chain structure in safe,
//!   verifiable layers so each piece can be reasoned about independently.
//! - Layers:
//!   - RawTable<H, A>: the untyped engine. Owns the power-of-two bucket
//!     array, a slot arena of entries, and the single global list whose
//!     contiguous runs are the per-bucket collision chains. Returns
//!     stable generational EntryIds instead of entry pointers.
//!   - Table<V>: typed wrapper that fixes a `Pod` payload type per table
//!     and accepts keys through the `KeyBytes` policy trait, so hosts
//!     never touch byte views or cast.
//!
//! Constraints
//! - Single-threaded, synchronous: every operation runs to completion;
//!   no locks, no atomics, no suspension points.
//! - Fixed bucket count: chosen at creation, never resized; load factor
//!   is the host's problem by design.
//! - One allocator call per entry: payload and key copy live in one
//!   block obtained from a caller-injected `BlockAllocator`.
//! - Chain discipline: each bucket's chain is LIFO by insertion time and
//!   terminates at its single tail-flagged member, the oldest survivor.
//!   Removal repairs bucket heads and transfers the tail flag, so the
//!   invariants hold after any operation sequence.
//!
//! Why an arena instead of intrusive pointers?
//! - The dual-purpose list (collision chain + iteration order) aliases
//!   aggressively; as raw pointers it is unverifiable. Slot-arena indices
//!   with generations keep O(1) link/unlink while making stale handles
//!   and dangling bucket references resolve to `None` instead of UB.
//!
//! Hashing and seeds
//! - The hash function is an external collaborator behind `KeyHasher`
//!   (`hash(bytes, seed) -> u32`); the engine only masks its low bits.
//!   Tables created with distinct seeds decorrelate their collision
//!   patterns.
//!
//! Notes and non-goals
//! - No resizing or rehashing; no thread-safety; no persistence.
//! - Lookup misses and removals of absent keys are normal outcomes, not
//!   errors; the error taxonomy is allocation failure plus parameter
//!   misuse only.
//! - Lifecycle hooks (`on_create`/`on_remove`) run only while the
//!   structure is fully linked and consistent.

mod alloc;
mod entry;
mod error;
mod hash;
mod raw;
mod raw_proptest;
mod typed;

// Public surface
pub use alloc::{AllocError, BlockAllocator, GlobalBlocks, PoolBlocks};
pub use entry::EntryId;
pub use error::{TableError, MAX_BUCKET_BITS};
pub use hash::{KeyHasher, SipKeyHash, DEFAULT_SEED};
pub use raw::{EntryHook, Iter as RawIter, RawTable, TableOptions};
pub use typed::{Iter, KeyBytes, Table, TypedHook, TypedOptions};
