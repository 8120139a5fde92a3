//! Typed wrapper over the untyped engine.
//!
//! `Table<V>` fixes the payload type at compile time and forwards to
//! [`RawTable`], so hosts read and write `V` values instead of byte
//! views. Keys go through the [`KeyBytes`] policy trait, which covers the
//! three conventions the engine is used with: explicit byte strings,
//! string keys, and typed keys synthesized from plain-old-data arguments
//! (including composite `Pod` structs). No dispatch is involved; the
//! payload type is fixed per table type.
//!
//! Entry blocks are byte-aligned, so typed access copies values in and
//! out (`pod_read_unaligned`/`bytes_of`); for `Pod` payloads these are
//! memcpys of `size_of::<V>()` bytes.

use crate::alloc::{BlockAllocator, GlobalBlocks};
use crate::entry::EntryId;
use crate::error::TableError;
use crate::hash::{KeyHasher, SipKeyHash, DEFAULT_SEED};
use crate::raw::{self, EntryHook, RawTable, TableOptions};
use bytemuck::Pod;
use core::marker::PhantomData;

/// Key-extraction policy: anything presentable as key bytes.
///
/// Implemented for `[u8]` (explicit bytes), `str` (string keys), and
/// every `T: Pod` (typed keys; a composite key is a `#[repr(C)]` `Pod`
/// struct). Hosts with bespoke key synthesis implement this directly.
pub trait KeyBytes {
    fn key_bytes(&self) -> &[u8];
}

impl KeyBytes for [u8] {
    fn key_bytes(&self) -> &[u8] {
        self
    }
}

impl KeyBytes for str {
    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<T: Pod> KeyBytes for T {
    fn key_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Typed lifecycle hook: `(key_bytes, &mut value)`.
pub type TypedHook<V> = Box<dyn FnMut(&[u8], &mut V)>;

/// Creation-time options for a typed table.
pub struct TypedOptions<V> {
    pub seed: u32,
    pub on_create: Option<TypedHook<V>>,
    pub on_remove: Option<TypedHook<V>>,
}

impl<V> Default for TypedOptions<V> {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            on_create: None,
            on_remove: None,
        }
    }
}

fn lower_hook<V: Pod>(mut hook: TypedHook<V>) -> EntryHook {
    Box::new(move |key, payload| {
        let mut value: V = bytemuck::pod_read_unaligned(payload);
        hook(key, &mut value);
        payload.copy_from_slice(bytemuck::bytes_of(&value));
    })
}

/// Hash table with a fixed `Pod` payload type per entry.
pub struct Table<V, H: KeyHasher = SipKeyHash, A: BlockAllocator = GlobalBlocks> {
    raw: RawTable<H, A>,
    _payload: PhantomData<V>,
}

impl<V: Pod> Table<V> {
    /// Create a table with `1 << bucket_bits` buckets; payload size is
    /// `size_of::<V>()`.
    pub fn new(bucket_bits: u32) -> Result<Self, TableError> {
        Self::with_options(bucket_bits, SipKeyHash, GlobalBlocks, TypedOptions::default())
    }
}

impl<V, H, A> Table<V, H, A>
where
    V: Pod,
    H: KeyHasher,
    A: BlockAllocator,
{
    /// Create a table with an injected hasher, allocator, seed and hooks.
    pub fn with_options(
        bucket_bits: u32,
        hasher: H,
        alloc: A,
        options: TypedOptions<V>,
    ) -> Result<Self, TableError> {
        let raw = RawTable::with_options(
            bucket_bits,
            core::mem::size_of::<V>(),
            hasher,
            alloc,
            TableOptions {
                seed: options.seed,
                on_create: options.on_create.map(lower_hook),
                on_remove: options.on_remove.map(lower_hook),
            },
        )?;
        Ok(Self {
            raw,
            _payload: PhantomData,
        })
    }

    pub fn bucket_count(&self) -> usize {
        self.raw.bucket_count()
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Return the entry for `key`, creating it (zero-valued) if absent.
    pub fn create_or_get<K>(&mut self, key: &K) -> Result<EntryId, TableError>
    where
        K: KeyBytes + ?Sized,
    {
        self.raw.create_or_get(key.key_bytes())
    }

    /// Create the entry for `key` if absent and store `value` in it.
    ///
    /// An existing entry keeps its current value, matching the
    /// idempotent create-or-get contract.
    pub fn create_with<K>(&mut self, key: &K, value: V) -> Result<EntryId, TableError>
    where
        K: KeyBytes + ?Sized,
    {
        let existed = self.lookup(key).is_some();
        let id = self.create_or_get(key)?;
        if !existed {
            self.set(id, value);
        }
        Ok(id)
    }

    pub fn lookup<K>(&self, key: &K) -> Option<EntryId>
    where
        K: KeyBytes + ?Sized,
    {
        self.raw.lookup(key.key_bytes())
    }

    /// Value stored under `key`, if present.
    pub fn value<K>(&self, key: &K) -> Option<V>
    where
        K: KeyBytes + ?Sized,
    {
        self.get(self.lookup(key)?)
    }

    pub fn remove<K>(&mut self, key: &K) -> bool
    where
        K: KeyBytes + ?Sized,
    {
        self.raw.remove(key.key_bytes())
    }

    pub fn destroy_entry(&mut self, id: EntryId) -> bool {
        self.raw.destroy_entry(id)
    }

    pub fn clear(&mut self) {
        self.raw.clear()
    }

    /// Copy out the entry's value; `None` for stale ids.
    pub fn get(&self, id: EntryId) -> Option<V> {
        self.raw.payload(id).map(bytemuck::pod_read_unaligned)
    }

    /// Overwrite the entry's value; `false` for stale ids.
    pub fn set(&mut self, id: EntryId, value: V) -> bool {
        match self.raw.payload_mut(id) {
            Some(payload) => {
                payload.copy_from_slice(bytemuck::bytes_of(&value));
                true
            }
            None => false,
        }
    }

    /// Read-modify-write the entry's value; `false` for stale ids.
    pub fn update<F>(&mut self, id: EntryId, f: F) -> bool
    where
        F: FnOnce(&mut V),
    {
        let Some(mut value) = self.get(id) else {
            return false;
        };
        f(&mut value);
        self.set(id, value)
    }

    pub fn key_bytes(&self, id: EntryId) -> Option<&[u8]> {
        self.raw.key(id)
    }

    pub fn first(&self) -> Option<EntryId> {
        self.raw.first()
    }

    pub fn next(&self, id: EntryId) -> Option<EntryId> {
        self.raw.next(id)
    }

    pub fn prev(&self, id: EntryId) -> Option<EntryId> {
        self.raw.prev(id)
    }

    /// Iterate `(id, key_bytes, value)` in global-list order.
    pub fn iter(&self) -> Iter<'_, V, H, A> {
        Iter {
            inner: self.raw.iter(),
            _payload: PhantomData,
        }
    }

    /// The untyped engine underneath, for byte-level access.
    pub fn raw(&self) -> &RawTable<H, A> {
        &self.raw
    }

    pub fn raw_mut(&mut self) -> &mut RawTable<H, A> {
        &mut self.raw
    }
}

/// Iterator over `(id, key, value)` for a typed table.
pub struct Iter<'a, V, H: KeyHasher, A: BlockAllocator> {
    inner: raw::Iter<'a, H, A>,
    _payload: PhantomData<V>,
}

impl<'a, V: Pod, H: KeyHasher, A: BlockAllocator> Iterator for Iter<'a, V, H, A> {
    type Item = (EntryId, &'a [u8], V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(id, key, payload)| (id, key, bytemuck::pod_read_unaligned(payload)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    /// Invariant: `str`, `[u8]` and `Pod` keys producing the same bytes
    /// address the same entry.
    #[test]
    fn key_conventions_agree_on_bytes() {
        let mut t: Table<u32> = Table::new(4).unwrap();
        let by_str = t.create_or_get("four").unwrap();
        let by_bytes = t.create_or_get(b"four".as_slice()).unwrap();
        assert_eq!(by_str, by_bytes);
        assert_eq!(t.len(), 1);

        let k = 7u32;
        let by_int = t.create_or_get(&k).unwrap();
        let by_raw = t.create_or_get(k.to_ne_bytes().as_slice()).unwrap();
        assert_eq!(by_int, by_raw);
        assert_eq!(t.len(), 2);
    }

    /// Invariant: composite `Pod` keys work through the blanket impl.
    #[test]
    fn composite_pod_key() {
        #[repr(C)]
        #[derive(Clone, Copy, Pod, Zeroable, PartialEq, Debug)]
        struct PairKey {
            a: u32,
            b: u32,
        }

        let mut t: Table<u64> = Table::new(3).unwrap();
        let k1 = PairKey { a: 1, b: 2 };
        let k2 = PairKey { a: 2, b: 1 };
        let e1 = t.create_with(&k1, 12).unwrap();
        let e2 = t.create_with(&k2, 21).unwrap();
        assert_ne!(e1, e2);
        assert_eq!(t.value(&k1), Some(12));
        assert_eq!(t.value(&k2), Some(21));
        assert_eq!(t.key_bytes(e1).unwrap(), bytemuck::bytes_of(&k1));
    }

    /// Invariant: new entries are zero-valued; create_with does not
    /// overwrite an existing entry.
    #[test]
    fn creation_value_semantics() {
        let mut t: Table<u64> = Table::new(3).unwrap();
        let id = t.create_or_get("z").unwrap();
        assert_eq!(t.get(id), Some(0));

        assert!(t.set(id, 5));
        let again = t.create_with("z", 99).unwrap();
        assert_eq!(again, id);
        assert_eq!(t.get(id), Some(5), "create_with must not clobber");
    }

    /// Invariant: update reads and writes through the same entry block.
    #[test]
    fn update_read_modify_write() {
        let mut t: Table<i32> = Table::new(2).unwrap();
        let id = t.create_with("n", 10).unwrap();
        assert!(t.update(id, |v| *v += 5));
        assert_eq!(t.get(id), Some(15));

        t.destroy_entry(id);
        assert!(!t.update(id, |v| *v += 1));
        assert!(!t.set(id, 0));
        assert_eq!(t.get(id), None);
    }

    /// Invariant: typed hooks see the key and can initialize the value.
    #[test]
    fn typed_hooks_lowered_onto_bytes() {
        let options = TypedOptions::<u32> {
            on_create: Some(Box::new(|key, value| *value = key.len() as u32)),
            ..TypedOptions::default()
        };
        let mut t: Table<u32> =
            Table::with_options(3, SipKeyHash, GlobalBlocks, options).unwrap();
        let id = t.create_or_get("seven!!").unwrap();
        assert_eq!(t.get(id), Some(7));
    }

    /// Invariant: typed iteration yields each entry once with its value.
    #[test]
    fn typed_iteration() {
        let mut t: Table<u32> = Table::new(4).unwrap();
        for i in 0u32..10 {
            t.create_with(&i, i * i).unwrap();
        }
        let mut seen: Vec<(u32, u32)> = t
            .iter()
            .map(|(_, key, v)| (bytemuck::pod_read_unaligned::<u32>(key), v))
            .collect();
        seen.sort_unstable();
        let expected: Vec<(u32, u32)> = (0..10).map(|i| (i, i * i)).collect();
        assert_eq!(seen, expected);
    }

    /// Invariant: zero-sized payload tables behave as byte-keyed sets.
    #[test]
    fn zero_sized_payload() {
        let mut t: Table<()> = Table::new(2).unwrap();
        t.create_or_get("member").unwrap();
        assert!(t.lookup("member").is_some());
        assert!(t.lookup("absent").is_none());
        assert_eq!(t.raw().payload_size(), 0);
    }
}
