//! Entry record: the node type threaded by the global list.
//!
//! Each entry is one arena slot plus one byte block holding the payload
//! followed by a copy of the key, mirroring a single-allocation layout:
//! combined key+value access touches one block, and the allocator is
//! called once per entry. Links are arena keys, never pointers, so a
//! stale [`EntryId`] resolves to `None` instead of dangling.

use slotmap::DefaultKey;

/// Stable, generation-checked reference to a live entry.
///
/// Obtained from `create_or_get`/`lookup`/iteration; remains valid until
/// the entry is destroyed or the table is torn down, after which every
/// accessor returns `None` for it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct EntryId(DefaultKey);

impl EntryId {
    pub(crate) fn new(k: DefaultKey) -> Self {
        EntryId(k)
    }

    pub(crate) fn raw(&self) -> DefaultKey {
        self.0
    }
}

/// One table entry: list links, chain metadata, and the data block.
///
/// `data` holds `payload_len()` payload bytes followed by `key_len` key
/// bytes; the payload length is recovered from the block length rather
/// than stored, since the block is sized exactly at creation.
#[derive(Debug)]
pub(crate) struct EntryNode {
    pub(crate) prev: Option<DefaultKey>,
    pub(crate) next: Option<DefaultKey>,
    /// Bucket index computed at insertion; removal uses it instead of
    /// re-hashing the key.
    pub(crate) bucket: u32,
    pub(crate) key_len: u16,
    /// Terminates its bucket's chain walk. Held by the chronologically
    /// oldest surviving member of the bucket.
    pub(crate) bucket_tail: bool,
    pub(crate) data: Box<[u8]>,
}

impl EntryNode {
    pub(crate) fn payload_len(&self) -> usize {
        self.data.len() - self.key_len as usize
    }

    pub(crate) fn key(&self) -> &[u8] {
        &self.data[self.payload_len()..]
    }

    pub(crate) fn payload(&self) -> &[u8] {
        &self.data[..self.payload_len()]
    }

    pub(crate) fn payload_mut(&mut self) -> &mut [u8] {
        let n = self.payload_len();
        &mut self.data[..n]
    }

    /// Split the block into (key, payload) for hook invocation.
    pub(crate) fn split_mut(&mut self) -> (&[u8], &mut [u8]) {
        let n = self.payload_len();
        let (payload, key) = self.data.split_at_mut(n);
        (&*key, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(payload: &[u8], key: &[u8]) -> EntryNode {
        let mut data = vec![0u8; payload.len() + key.len()];
        data[..payload.len()].copy_from_slice(payload);
        data[payload.len()..].copy_from_slice(key);
        EntryNode {
            prev: None,
            next: None,
            bucket: 0,
            key_len: key.len() as u16,
            bucket_tail: false,
            data: data.into_boxed_slice(),
        }
    }

    /// Invariant: payload occupies the block head, key the block tail.
    #[test]
    fn block_regions() {
        let mut n = node(&[1, 2, 3, 4], b"key");
        assert_eq!(n.payload_len(), 4);
        assert_eq!(n.payload(), &[1, 2, 3, 4]);
        assert_eq!(n.key(), b"key");

        n.payload_mut()[0] = 9;
        assert_eq!(n.payload(), &[9, 2, 3, 4]);
        assert_eq!(n.key(), b"key", "payload writes must not touch the key");

        let (k, p) = n.split_mut();
        assert_eq!(k, b"key");
        assert_eq!(p.len(), 4);
    }

    /// Invariant: zero-size payloads and empty keys are representable.
    #[test]
    fn degenerate_regions() {
        let n = node(&[], b"k");
        assert_eq!(n.payload(), &[] as &[u8]);
        assert_eq!(n.key(), b"k");

        let n = node(&[7], b"");
        assert_eq!(n.payload(), &[7]);
        assert_eq!(n.key(), b"");
    }
}
