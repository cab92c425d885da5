//! ChainMap: separately chained hash map with stable cursors.

use crate::guard::DebugGuard;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;
use std::collections::TryReserveError;

/// One entry of a bucket chain. The chain is threaded through the arena with
/// optional keys: `next` walks toward the tail, `prev` toward the head. The
/// stored hash is computed once at insertion; rehashing never calls back
/// into `K: Hash`.
#[derive(Debug, Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    hash: u64,
    next: Option<DefaultKey>,
    prev: Option<DefaultKey>,
}

/// A hash map using separate chaining with duplicate keys allowed.
///
/// Each bucket holds the head of a doubly linked chain of entries; the nodes
/// themselves live in a [`SlotMap`] arena and are addressed by generational
/// keys. `insert` always appends at the tail of the target chain, so equal
/// keys accumulate, and [`find`](ChainMap::find) returns the oldest entry
/// for a key.
///
/// The map grows (doubling, starting at 2) when every bucket is non-empty,
/// regardless of how unevenly the chains are loaded. Growth re-keys every
/// node, so all cursors issued earlier go stale; their accessors then return
/// `None` instead of touching relocated entries. Inserts that do not grow
/// the table leave existing cursors valid.
///
/// Single-threaded by design: no locks, no atomics. A debug-only guard
/// panics if user `Hash`/`Eq` code reenters the map mid-operation.
pub struct ChainMap<K, V, S = RandomState> {
    hasher: S,
    /// Slot `i` holds the head of chain `i`, or `None` while the bucket is
    /// empty. The array length is the capacity.
    buckets: Vec<Option<DefaultKey>>,
    /// Count of buckets still empty. Reaching zero triggers growth on the
    /// next insert. Always `<= buckets.len()`.
    vacant_buckets: usize,
    slots: SlotMap<DefaultKey, Node<K, V>>,
    guard: DebugGuard,
}

/// Error returned by a failed [`ChainMap::insert`].
#[derive(Debug)]
pub enum InsertError {
    /// The bucket array could not be enlarged to admit another chain. The
    /// map is unchanged.
    Grow(TryReserveError),
}

impl<K, V> ChainMap<K, V>
where
    K: Eq + Hash,
{
    /// An empty map with the default hasher. Does not allocate; the first
    /// insert grows the table to 2 buckets.
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<K, V, S> Default for ChainMap<K, V, S>
where
    S: Default,
{
    fn default() -> Self {
        Self {
            hasher: Default::default(),
            buckets: Vec::new(),
            vacant_buckets: 0,
            slots: SlotMap::with_key(),
            guard: DebugGuard::new(),
        }
    }
}

impl<K, V, S> ChainMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            buckets: Vec::new(),
            vacant_buckets: 0,
            slots: SlotMap::with_key(),
            guard: DebugGuard::new(),
        }
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    fn bucket_index(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    /// Append an entry at the tail of its bucket chain and return a cursor
    /// to it. Duplicate keys are accepted; nothing is overwritten.
    ///
    /// Growth happens here when no bucket is empty, and its failure is the
    /// failure of the insert: on `Err` the map is exactly as it was. A
    /// growth committed by an earlier insert is never rolled back.
    pub fn insert(&mut self, key: K, value: V) -> Result<Cursor, InsertError> {
        // Saturation is checked before hashing so a zero-capacity table has
        // grown by the time any modulus is taken.
        if self.vacant_buckets == 0 {
            self.grow().map_err(InsertError::Grow)?;
        }
        let _g = self.guard.enter();
        let hash = self.make_hash(&key);
        let idx = self.bucket_index(hash);

        let mut tail = None;
        let mut cur = self.buckets[idx];
        while let Some(k) = cur {
            tail = Some(k);
            cur = self.slots[k].next;
        }

        let node = self.slots.insert(Node {
            key,
            value,
            hash,
            next: None,
            prev: tail,
        });
        match tail {
            Some(t) => self.slots[t].next = Some(node),
            None => {
                self.buckets[idx] = Some(node);
                self.vacant_buckets -= 1;
            }
        }
        Ok(Cursor {
            bucket: idx,
            node: Some(node),
        })
    }

    /// Cursor to the oldest entry whose key equals `q`, or `None`. The scan
    /// runs from the chain head, so among duplicates the earliest insert
    /// wins.
    pub fn find<Q>(&self, q: &Q) -> Option<Cursor>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.guard.enter();
        if self.buckets.is_empty() {
            return None;
        }
        let hash = self.make_hash(q);
        let idx = self.bucket_index(hash);
        let mut cur = self.buckets[idx];
        while let Some(k) = cur {
            let node = &self.slots[k];
            if node.key.borrow() == q {
                return Some(Cursor {
                    bucket: idx,
                    node: Some(k),
                });
            }
            cur = node.next;
        }
        None
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).is_some()
    }
}

impl<K, V, S> ChainMap<K, V, S> {
    /// Number of entries. Tracked by the arena; this is *not* the
    /// occupied-bucket count that drives growth.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of buckets. Zero for a fresh map; 2, then doubling, once
    /// anything has been inserted.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Number of buckets holding at least one entry. A bucket with a
    /// five-entry chain counts once; growth triggers when this reaches
    /// [`capacity`](ChainMap::capacity).
    pub fn occupied_buckets(&self) -> usize {
        self.buckets.len() - self.vacant_buckets
    }

    /// Cursor to the first entry in traversal order (lowest occupied bucket,
    /// head of its chain), or the end sentinel when the map is empty.
    pub fn begin(&self) -> Cursor {
        self.first_from(0)
    }

    /// The end sentinel: one position past the last bucket. Never holds an
    /// entry.
    pub fn end(&self) -> Cursor {
        Cursor {
            bucket: self.buckets.len(),
            node: None,
        }
    }

    /// Iterate in bucket-index order, then chain order within a bucket:
    /// the same walk as advancing a cursor from `begin()` to `end()`.
    pub fn iter(&self) -> Iter<'_, K, V, S> {
        Iter {
            map: self,
            cursor: self.begin(),
        }
    }

    /// Mutable iteration over all entries. Visits each entry exactly once in
    /// unspecified order; use [`iter`](ChainMap::iter) or the cursor
    /// protocol when traversal order matters.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, S> {
        IterMut {
            capacity: self.buckets.len(),
            it: self.slots.iter_mut(),
            _pd: PhantomData,
        }
    }

    fn first_from(&self, start: usize) -> Cursor {
        for (i, head) in self.buckets.iter().enumerate().skip(start) {
            if let Some(k) = *head {
                return Cursor {
                    bucket: i,
                    node: Some(k),
                };
            }
        }
        self.end()
    }

    fn chain_tail(&self, head: DefaultKey) -> DefaultKey {
        let mut cur = head;
        while let Some(n) = self.slots[cur].next {
            cur = n;
        }
        cur
    }

    /// Double the bucket array (2 when starting from empty) and relocate
    /// every entry to `stored_hash % new_capacity`, preserving relative
    /// order among entries that land in the same new bucket.
    ///
    /// Both allocations happen before anything is touched, so a failure
    /// leaves the map exactly as it was. Relocation removes and reinserts
    /// each node, which bumps its slot generation: every cursor issued
    /// before the growth stops resolving.
    fn grow(&mut self) -> Result<(), TryReserveError> {
        let old_cap = self.buckets.len();
        let new_cap = if old_cap == 0 { 2 } else { old_cap * 2 };

        let mut heads: Vec<Option<DefaultKey>> = Vec::new();
        heads.try_reserve_exact(new_cap)?;
        let mut tails: Vec<Option<DefaultKey>> = Vec::new();
        tails.try_reserve_exact(new_cap)?;
        heads.resize(new_cap, None);
        tails.resize(new_cap, None);

        let old_heads = std::mem::replace(&mut self.buckets, heads);
        let mut vacant = new_cap;
        for mut cur in old_heads {
            while let Some(key) = cur {
                let node = self.slots.remove(key).unwrap();
                cur = node.next;
                let idx = (node.hash % new_cap as u64) as usize;
                let relocated = self.slots.insert(Node {
                    next: None,
                    prev: tails[idx],
                    ..node
                });
                match tails[idx] {
                    Some(t) => self.slots[t].next = Some(relocated),
                    None => {
                        self.buckets[idx] = Some(relocated);
                        vacant -= 1;
                    }
                }
                tails[idx] = Some(relocated);
            }
        }
        self.vacant_buckets = vacant;
        Ok(())
    }
}

impl<K, V, S> Clone for ChainMap<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    /// Deep copy. The cloned arena keeps the same slot keys, so every chain
    /// link carries over verbatim; the copies share no storage afterwards.
    fn clone(&self) -> Self {
        Self {
            hasher: self.hasher.clone(),
            buckets: self.buckets.clone(),
            vacant_buckets: self.vacant_buckets,
            slots: self.slots.clone(),
            guard: DebugGuard::new(),
        }
    }

    /// Copy assignment with copy-and-swap discipline: the copy is built
    /// first, then replaces `self` wholesale.
    fn clone_from(&mut self, source: &Self) {
        *self = source.clone();
    }
}

impl<K, V, S> fmt::Debug for ChainMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(_, k, v)| (k, v)))
            .finish()
    }
}

/// A bidirectional position in a [`ChainMap`]: a bucket index plus the
/// generational key of the current node. Copyable and detached: accessors
/// take the map, so holding a cursor never borrows the container.
///
/// The end sentinel has no node and a bucket index equal to the capacity.
/// A cursor issued before a growth-triggering insert is stale: accessors
/// return `None` and traversal from it lands on the end sentinel. Equality
/// is positional and only meaningful between cursors of the same map.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Cursor {
    bucket: usize,
    node: Option<DefaultKey>,
}

impl Cursor {
    /// Index of the bucket this cursor points into (the capacity, for the
    /// end sentinel).
    pub fn bucket(&self) -> usize {
        self.bucket
    }

    /// True for the end sentinel. Stale cursors still report `false`; they
    /// reveal themselves by resolving to `None`.
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }

    pub fn key<'a, K, V, S>(&self, map: &'a ChainMap<K, V, S>) -> Option<&'a K> {
        let _g = map.guard.enter();
        let key = self.node?;
        map.slots.get(key).map(|n| &n.key)
    }

    pub fn value<'a, K, V, S>(&self, map: &'a ChainMap<K, V, S>) -> Option<&'a V> {
        let _g = map.guard.enter();
        let key = self.node?;
        map.slots.get(key).map(|n| &n.value)
    }

    /// Mutable access to the current entry's value. Keys are immutable once
    /// inserted.
    pub fn value_mut<'a, K, V, S>(&self, map: &'a mut ChainMap<K, V, S>) -> Option<&'a mut V> {
        let _g = map.guard.enter();
        let key = self.node?;
        map.slots.get_mut(key).map(|n| &mut n.value)
    }

    /// The next position in traversal order: the chain successor, else the
    /// head of the next occupied bucket, else the end sentinel. A stale
    /// cursor advances straight to the end sentinel.
    pub fn next<K, V, S>(self, map: &ChainMap<K, V, S>) -> Cursor {
        let Some(key) = self.node else {
            return map.end();
        };
        let Some(node) = map.slots.get(key) else {
            return map.end();
        };
        if let Some(n) = node.next {
            return Cursor {
                bucket: self.bucket,
                node: Some(n),
            };
        }
        map.first_from(self.bucket + 1)
    }

    /// The previous position: the chain predecessor, else the tail of the
    /// nearest occupied bucket below. Clamped at the first entry: calling
    /// `prev` there returns the cursor unchanged. From the end sentinel it
    /// steps onto the last entry. A stale cursor regresses to the end
    /// sentinel.
    pub fn prev<K, V, S>(self, map: &ChainMap<K, V, S>) -> Cursor {
        match self.node {
            Some(key) => {
                let Some(node) = map.slots.get(key) else {
                    return map.end();
                };
                if let Some(p) = node.prev {
                    return Cursor {
                        bucket: self.bucket,
                        node: Some(p),
                    };
                }
                match map.last_below(self.bucket) {
                    Some(c) => c,
                    None => self,
                }
            }
            None => {
                let start = self.bucket.min(map.buckets.len());
                match map.last_below(start) {
                    Some(c) => c,
                    None => self,
                }
            }
        }
    }
}

impl<K, V, S> ChainMap<K, V, S> {
    /// Tail of the nearest occupied bucket strictly below `bucket`.
    fn last_below(&self, bucket: usize) -> Option<Cursor> {
        let mut i = bucket;
        while i > 0 {
            i -= 1;
            if let Some(head) = self.buckets[i] {
                return Some(Cursor {
                    bucket: i,
                    node: Some(self.chain_tail(head)),
                });
            }
        }
        None
    }
}

/// Iterator over all entries in bucket-then-chain order.
pub struct Iter<'a, K, V, S = RandomState> {
    map: &'a ChainMap<K, V, S>,
    cursor: Cursor,
}

impl<'a, K, V, S> Iterator for Iter<'a, K, V, S> {
    type Item = (Cursor, &'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let map = self.map;
        let key = self.cursor.node?;
        let node = map.slots.get(key)?;
        let at = self.cursor;
        self.cursor = at.next(map);
        Some((at, &node.key, &node.value))
    }
}

/// Mutable iterator over all entries, in unspecified order.
pub struct IterMut<'a, K, V, S = RandomState> {
    capacity: usize,
    it: slotmap::basic::IterMut<'a, DefaultKey, Node<K, V>>,
    _pd: PhantomData<&'a (K, V, S)>,
}

impl<'a, K, V, S> Iterator for IterMut<'a, K, V, S> {
    type Item = (Cursor, &'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(k, node)| {
            let bucket = (node.hash % self.capacity as u64) as usize;
            (
                Cursor {
                    bucket,
                    node: Some(k),
                },
                &node.key,
                &mut node.value,
            )
        })
    }
}

#[cfg(test)]
impl<K, V, S> ChainMap<K, V, S> {
    /// Walk the whole structure and assert every internal invariant: exact
    /// vacant-bucket budget, symmetric chain links, hash-consistent bucket
    /// placement, and no arena nodes outside a chain.
    pub(crate) fn check_invariants(&self) {
        let capacity = self.buckets.len();
        assert!(self.vacant_buckets <= capacity);
        let mut entries = 0usize;
        let mut vacant = 0usize;
        for (i, head) in self.buckets.iter().enumerate() {
            let Some(head) = *head else {
                vacant += 1;
                continue;
            };
            let mut prev = None;
            let mut cur = Some(head);
            while let Some(key) = cur {
                let node = self.slots.get(key).expect("chain links a live node");
                assert_eq!(node.prev, prev, "chain back-link out of sync");
                assert_eq!(
                    (node.hash % capacity as u64) as usize,
                    i,
                    "node filed under the wrong bucket"
                );
                entries += 1;
                prev = Some(key);
                cur = node.next;
            }
        }
        assert_eq!(vacant, self.vacant_buckets, "vacant-bucket budget drifted");
        assert_eq!(entries, self.slots.len(), "arena node not on any chain");
    }
}
