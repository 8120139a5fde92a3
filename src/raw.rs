//! Untyped hash table engine.
//!
//! `RawTable` owns a fixed power-of-two bucket array and a slot arena of
//! entries threaded by a single doubly-linked list. Each bucket's
//! collision chain is a contiguous run of that list, so the same links
//! give O(1) insertion, O(1) chain walks at low load factor, and O(1)
//! stepping during whole-table iteration. Per bucket, exactly one chain
//! member carries the tail flag: the oldest surviving entry, where chain
//! walks stop.
//!
//! New entries are spliced in front of their bucket's current head (or in
//! front of the global head when the bucket is empty), which makes each
//! chain LIFO by insertion time. Removal keeps the structure closed over
//! its own invariants: a removed head hands the bucket to its in-chain
//! successor, a removed tail hands the flag to its predecessor.

use crate::alloc::{BlockAllocator, GlobalBlocks};
use crate::entry::{EntryId, EntryNode};
use crate::error::{TableError, MAX_BUCKET_BITS};
use crate::hash::{KeyHasher, SipKeyHash, DEFAULT_SEED};
use slotmap::{DefaultKey, SlotMap};

/// Lifecycle hook invoked with `(key_bytes, payload_bytes)`.
///
/// `on_create` runs after a new entry is fully linked; `on_remove` runs
/// for each entry being destroyed, including during teardown.
pub type EntryHook = Box<dyn FnMut(&[u8], &mut [u8])>;

/// Creation-time options: hash seed and lifecycle hooks.
pub struct TableOptions {
    pub seed: u32,
    pub on_create: Option<EntryHook>,
    pub on_remove: Option<EntryHook>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            on_create: None,
            on_remove: None,
        }
    }
}

/// Bucket-indexed intrusive-list hash table over opaque payload bytes.
///
/// Payload size is fixed per table; keys are variable-length byte strings
/// copied into the entry block at creation. See the crate docs for the
/// typed wrapper most hosts use instead.
pub struct RawTable<H: KeyHasher = SipKeyHash, A: BlockAllocator = GlobalBlocks> {
    buckets: Box<[Option<DefaultKey>]>,
    bucket_bits: u32,
    payload_size: usize,
    seed: u32,
    first: Option<DefaultKey>,
    slots: SlotMap<DefaultKey, EntryNode>,
    hasher: H,
    alloc: A,
    on_create: Option<EntryHook>,
    on_remove: Option<EntryHook>,
}

impl RawTable {
    /// Create a table with `1 << bucket_bits` buckets and `payload_size`
    /// payload bytes per entry, using the default hasher, the global
    /// allocator, and default options.
    pub fn new(bucket_bits: u32, payload_size: usize) -> Result<Self, TableError> {
        Self::with_options(
            bucket_bits,
            payload_size,
            SipKeyHash,
            GlobalBlocks,
            TableOptions::default(),
        )
    }
}

impl<H, A> RawTable<H, A>
where
    H: KeyHasher,
    A: BlockAllocator,
{
    /// Create a table with an injected hasher, allocator, seed and hooks.
    pub fn with_options(
        bucket_bits: u32,
        payload_size: usize,
        hasher: H,
        alloc: A,
        options: TableOptions,
    ) -> Result<Self, TableError> {
        if bucket_bits > MAX_BUCKET_BITS {
            return Err(TableError::BucketBits(bucket_bits));
        }
        let nbuckets = 1usize
            .checked_shl(bucket_bits)
            .ok_or(TableError::BucketBits(bucket_bits))?;
        Ok(Self {
            buckets: vec![None; nbuckets].into_boxed_slice(),
            bucket_bits,
            payload_size,
            seed: options.seed,
            first: None,
            slots: SlotMap::with_key(),
            hasher,
            alloc,
            on_create: options.on_create,
            on_remove: options.on_remove,
        })
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn bucket_bits(&self) -> u32 {
        self.bucket_bits
    }

    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Bucket index this key maps to, for the table's seed and mask.
    pub fn bucket_of(&self, key: &[u8]) -> usize {
        let mask = (self.buckets.len() - 1) as u32;
        (self.hasher.hash(key, self.seed) & mask) as usize
    }

    /// Most-recently-inserted live entry in `bucket`, if any.
    pub fn bucket_head(&self, bucket: usize) -> Option<EntryId> {
        self.buckets.get(bucket).copied().flatten().map(EntryId::new)
    }

    /// Whether this entry terminates its bucket's chain. `None` for
    /// stale ids.
    pub fn is_bucket_tail(&self, id: EntryId) -> Option<bool> {
        self.slots.get(id.raw()).map(|n| n.bucket_tail)
    }

    /// Find the entry for `key`, walking its bucket's chain until the
    /// flagged tail. A miss is a normal outcome.
    pub fn lookup(&self, key: &[u8]) -> Option<EntryId> {
        let mut cur = self.buckets[self.bucket_of(key)];
        while let Some(k) = cur {
            let node = self.slots.get(k)?;
            if node.key() == key {
                return Some(EntryId::new(k));
            }
            if node.bucket_tail {
                return None;
            }
            cur = node.next;
        }
        None
    }

    /// Return the entry for `key`, creating it if absent.
    ///
    /// Idempotent: repeated calls with the same key return the same id
    /// without allocating. A new entry becomes its bucket's head; its
    /// payload starts zeroed and `on_create` runs once it is linked.
    pub fn create_or_get(&mut self, key: &[u8]) -> Result<EntryId, TableError> {
        if key.len() > u16::MAX as usize {
            return Err(TableError::KeyTooLong { len: key.len() });
        }
        if let Some(id) = self.lookup(key) {
            return Ok(id);
        }

        let bucket = self.bucket_of(key);
        let mut data = self.alloc.allocate(self.payload_size + key.len())?;
        data[self.payload_size..].copy_from_slice(key);

        // An entry opening a bucket goes in front of the whole list and
        // doubles as its chain's tail; otherwise it goes in front of the
        // current bucket head and the old tail stays put.
        let (splice_before, tail) = match self.buckets[bucket] {
            Some(head) => (Some(head), false),
            None => (self.first, true),
        };

        let k = self.slots.insert(EntryNode {
            prev: None,
            next: None,
            bucket: bucket as u32,
            key_len: key.len() as u16,
            bucket_tail: tail,
            data,
        });
        if let Some(pos) = splice_before {
            self.link_before(pos, k);
        }
        self.buckets[bucket] = Some(k);
        if self.slots.get(k).map(|n| n.prev.is_none()).unwrap_or(false) {
            self.first = Some(k);
        }

        if let Some(hook) = self.on_create.as_mut() {
            if let Some(node) = self.slots.get_mut(k) {
                let (key_bytes, payload) = node.split_mut();
                hook(key_bytes, payload);
            }
        }
        Ok(EntryId::new(k))
    }

    /// Remove the entry for `key` if present; `false` if absent.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        match self.lookup(key) {
            Some(id) => self.destroy_entry(id),
            None => false,
        }
    }

    /// Destroy one entry, repairing its bucket's head and tail flag
    /// before unlinking it from the global list. `false` for stale ids.
    pub fn destroy_entry(&mut self, id: EntryId) -> bool {
        let k = id.raw();
        let Some(mut node) = self.slots.remove(k) else {
            return false;
        };
        if let Some(hook) = self.on_remove.as_mut() {
            let (key_bytes, payload) = node.split_mut();
            hook(key_bytes, payload);
        }

        let bucket = node.bucket as usize;
        if self.buckets[bucket] == Some(k) {
            // Head of its chain: successor (still in-chain unless this
            // was the sole member) takes over the bucket.
            self.buckets[bucket] = if node.bucket_tail { None } else { node.next };
        } else if node.bucket_tail {
            // Tail with survivors: the predecessor is in the same chain
            // by contiguity and becomes the new terminator.
            if let Some(p) = node.prev {
                if let Some(prev_node) = self.slots.get_mut(p) {
                    prev_node.bucket_tail = true;
                }
            }
        }

        match node.prev {
            Some(p) => {
                if let Some(prev_node) = self.slots.get_mut(p) {
                    prev_node.next = node.next;
                }
            }
            None => self.first = node.next,
        }
        if let Some(nx) = node.next {
            if let Some(next_node) = self.slots.get_mut(nx) {
                next_node.prev = node.prev;
            }
        }

        self.alloc.release(node.data);
        true
    }

    /// Destroy every entry, running `on_remove` for each in iteration
    /// order and returning all blocks to the allocator.
    pub fn clear(&mut self) {
        let mut cur = self.first.take();
        while let Some(k) = cur {
            let Some(mut node) = self.slots.remove(k) else {
                break;
            };
            cur = node.next;
            if let Some(hook) = self.on_remove.as_mut() {
                let (key_bytes, payload) = node.split_mut();
                hook(key_bytes, payload);
            }
            self.alloc.release(node.data);
        }
        self.buckets.fill(None);
    }

    /// Head of the global iteration list.
    pub fn first(&self) -> Option<EntryId> {
        self.first.map(EntryId::new)
    }

    /// Successor of `id` in the global list; `None` at the end or for
    /// stale ids.
    pub fn next(&self, id: EntryId) -> Option<EntryId> {
        self.slots.get(id.raw())?.next.map(EntryId::new)
    }

    /// Predecessor of `id` in the global list.
    pub fn prev(&self, id: EntryId) -> Option<EntryId> {
        self.slots.get(id.raw())?.prev.map(EntryId::new)
    }

    pub fn key(&self, id: EntryId) -> Option<&[u8]> {
        self.slots.get(id.raw()).map(|n| n.key())
    }

    pub fn payload(&self, id: EntryId) -> Option<&[u8]> {
        self.slots.get(id.raw()).map(|n| n.payload())
    }

    pub fn payload_mut(&mut self, id: EntryId) -> Option<&mut [u8]> {
        self.slots.get_mut(id.raw()).map(|n| n.payload_mut())
    }

    /// Iterate every live entry in global-list order.
    pub fn iter(&self) -> Iter<'_, H, A> {
        Iter {
            table: self,
            cur: self.first,
        }
    }

    fn link_before(&mut self, pos: DefaultKey, new: DefaultKey) {
        let pos_prev = self.slots.get(pos).and_then(|n| n.prev);
        if let Some(node) = self.slots.get_mut(new) {
            node.prev = pos_prev;
            node.next = Some(pos);
        }
        if let Some(p) = pos_prev {
            if let Some(prev_node) = self.slots.get_mut(p) {
                prev_node.next = Some(new);
            }
        }
        if let Some(pos_node) = self.slots.get_mut(pos) {
            pos_node.prev = Some(new);
        }
    }

    /// Structural self-check used by tests: the global list threads every
    /// live entry exactly once with consistent back-links, and every
    /// bucket chain is a contiguous run ending at its single tail flag.
    #[cfg(test)]
    pub(crate) fn audit(&self) {
        use std::collections::HashSet;

        // Global list: full coverage, consistent links, no cycles.
        let mut seen: HashSet<DefaultKey> = HashSet::new();
        let mut cur = self.first;
        let mut prev: Option<DefaultKey> = None;
        while let Some(k) = cur {
            assert!(seen.insert(k), "global list revisits a node");
            assert!(seen.len() <= self.slots.len(), "global list cycles");
            let node = self.slots.get(k).expect("global list references a freed slot");
            assert_eq!(node.prev, prev, "back-link mismatch");
            prev = Some(k);
            cur = node.next;
        }
        assert_eq!(seen.len(), self.slots.len(), "global list misses entries");
        assert_eq!(self.first.is_none(), self.slots.is_empty());

        // Bucket chains: contiguous runs, correct bucket, one tail each.
        let mut chained: HashSet<DefaultKey> = HashSet::new();
        for (b, head) in self.buckets.iter().enumerate() {
            let mut cur = *head;
            let mut steps = 0usize;
            while let Some(k) = cur {
                let node = self.slots.get(k).expect("bucket chain references a freed slot");
                assert_eq!(node.bucket as usize, b, "entry filed in the wrong bucket");
                assert!(chained.insert(k), "entry appears in two chains");
                steps += 1;
                assert!(steps <= self.slots.len(), "bucket chain not terminated");
                if node.bucket_tail {
                    break;
                }
                cur = node.next;
                assert!(cur.is_some(), "chain ran off the global list without a tail");
            }
        }
        assert_eq!(
            chained.len(),
            self.slots.len(),
            "some entry is unreachable from its bucket head"
        );
    }
}

impl<H, A> Drop for RawTable<H, A>
where
    H: KeyHasher,
    A: BlockAllocator,
{
    fn drop(&mut self) {
        self.clear();
    }
}

/// Iterator over `(id, key, payload)` in global-list order.
pub struct Iter<'a, H: KeyHasher, A: BlockAllocator> {
    table: &'a RawTable<H, A>,
    cur: Option<DefaultKey>,
}

impl<'a, H: KeyHasher, A: BlockAllocator> Iterator for Iter<'a, H, A> {
    type Item = (EntryId, &'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cur?;
        let node = self.table.slots.get(k)?;
        self.cur = node.next;
        Some((EntryId::new(k), node.key(), node.payload()))
    }
}
