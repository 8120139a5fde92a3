//! Error taxonomy for table operations.
//!
//! Deliberately narrow: allocation failure and caller misuse. Lookup
//! misses and removals of absent keys are normal outcomes and are
//! reported through `Option`/`bool`, not through these types.

use crate::alloc::AllocError;
use thiserror::Error;

/// Maximum accepted bucket-count exponent; the bucket index is masked
/// out of a 32-bit hash.
pub const MAX_BUCKET_BITS: u32 = 32;

/// Errors returned by table construction and entry creation.
#[derive(Debug, Error)]
pub enum TableError {
    /// The injected allocator could not provide an entry block.
    #[error(transparent)]
    Alloc(#[from] AllocError),

    /// Key length does not fit the entry header's `u16` field.
    #[error("key length {len} exceeds maximum {max}", max = u16::MAX)]
    KeyTooLong { len: usize },

    /// Bucket-count exponent out of range for this platform or for the
    /// 32-bit bucket mask.
    #[error("bucket bits {0} not usable (maximum {MAX_BUCKET_BITS})")]
    BucketBits(u32),
}
