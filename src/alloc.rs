//! Capability-injected block allocation.
//!
//! The engine never calls a global allocator directly: every entry block
//! (payload bytes followed by key bytes) is obtained from and returned to
//! a [`BlockAllocator`] supplied at table creation. Hosts that want arena
//! or pool strategies implement this trait; [`GlobalBlocks`] is the
//! default and [`PoolBlocks`] keeps released blocks on a free list.

use thiserror::Error;

/// A block allocation request the allocator could not satisfy.
#[derive(Debug, Error)]
#[error("block allocation of {len} bytes failed")]
pub struct AllocError {
    /// Requested block length in bytes.
    pub len: usize,
}

/// Allocate/release pair used for entry storage.
///
/// `allocate` must return a zeroed block of exactly `len` bytes; the
/// table writes the key into its tail and hands the head to the caller
/// as the payload region. Blocks come back through `release` on entry
/// destruction and table teardown.
pub trait BlockAllocator {
    fn allocate(&mut self, len: usize) -> Result<Box<[u8]>, AllocError>;
    fn release(&mut self, block: Box<[u8]>);
}

/// Default allocator backed by the global heap.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalBlocks;

impl BlockAllocator for GlobalBlocks {
    fn allocate(&mut self, len: usize) -> Result<Box<[u8]>, AllocError> {
        Ok(vec![0u8; len].into_boxed_slice())
    }

    fn release(&mut self, block: Box<[u8]>) {
        drop(block);
    }
}

/// Free-list allocator that reuses released blocks of matching length.
///
/// Useful when a host churns entries of a few fixed key lengths and wants
/// to bound allocator traffic. Reused blocks are re-zeroed before being
/// handed out.
#[derive(Debug, Default)]
pub struct PoolBlocks {
    free: Vec<Box<[u8]>>,
    fresh: usize,
}

impl PoolBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks currently parked on the free list.
    pub fn free_blocks(&self) -> usize {
        self.free.len()
    }

    /// Number of blocks ever taken from the heap rather than the pool.
    pub fn fresh_allocations(&self) -> usize {
        self.fresh
    }
}

impl BlockAllocator for PoolBlocks {
    fn allocate(&mut self, len: usize) -> Result<Box<[u8]>, AllocError> {
        if let Some(i) = self.free.iter().position(|b| b.len() == len) {
            let mut block = self.free.swap_remove(i);
            block.fill(0);
            return Ok(block);
        }
        self.fresh += 1;
        Ok(vec![0u8; len].into_boxed_slice())
    }

    fn release(&mut self, block: Box<[u8]>) {
        self.free.push(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: released blocks of a matching length are reused, and
    /// reused blocks come back zeroed.
    #[test]
    fn pool_reuses_and_rezeroes() {
        let mut pool = PoolBlocks::new();
        let mut b = pool.allocate(8).unwrap();
        b.fill(0xAA);
        pool.release(b);
        assert_eq!(pool.free_blocks(), 1);

        let b2 = pool.allocate(8).unwrap();
        assert_eq!(pool.fresh_allocations(), 1, "second allocate must hit the pool");
        assert!(b2.iter().all(|&x| x == 0));
        assert_eq!(pool.free_blocks(), 0);
    }

    /// Invariant: length mismatches fall through to a fresh allocation.
    #[test]
    fn pool_length_mismatch_allocates_fresh() {
        let mut pool = PoolBlocks::new();
        let b = pool.allocate(8).unwrap();
        pool.release(b);
        let _b2 = pool.allocate(16).unwrap();
        assert_eq!(pool.fresh_allocations(), 2);
        assert_eq!(pool.free_blocks(), 1);
    }

    /// Invariant: the default allocator hands out zeroed blocks of the
    /// requested length.
    #[test]
    fn global_blocks_zeroed() {
        let b = GlobalBlocks.allocate(32).unwrap();
        assert_eq!(b.len(), 32);
        assert!(b.iter().all(|&x| x == 0));
    }
}
