//! chain-hashmap: a separately chained hash map with bidirectional,
//! bucket-ordered cursors and saturation-driven growth.
//!
//! Internal design:
//!
//! Summary
//! - Goal: an open-hashing (separate chaining) table whose storage,
//!   growth policy, and traversal protocol are all first-class, verifiable
//!   pieces rather than delegated to an off-the-shelf index.
//! - Layout:
//!   - Bucket array: `Vec<Option<DefaultKey>>`; slot `i` is empty or the
//!     head of chain `i`. The array length is the capacity.
//!   - Node arena: `SlotMap<DefaultKey, Node>` holding every entry; chains
//!     are threaded through it with optional `next`/`prev` keys, so links
//!     are generational indices instead of owning raw pointers.
//!   - `Cursor`: a copyable (bucket, node-key) position whose accessors
//!     take the map; it never borrows the container it points into.
//!
//! Constraints
//! - Single-threaded: no locks, no atomics; a debug-only reentrancy guard
//!   panics if user `Hash`/`Eq` code reenters the map mid-operation.
//! - Duplicate keys are accepted by design: insert always appends at the
//!   chain tail and `find` returns the oldest matching entry. This is a
//!   multimap-flavored contract, not an accident.
//! - Growth is keyed to bucket saturation, not load factor: the table
//!   doubles (from 0 to 2 on first insert) only when every bucket holds at
//!   least one entry. A single long chain never triggers growth while any
//!   bucket is empty.
//! - No removal of individual entries, no shrinking.
//!
//! Hasher and rehashing invariants
//! - Each node stores its `u64` hash at insertion and growth redistributes
//!   by `stored_hash % new_capacity`; `K: Hash` is never invoked after
//!   insertion, so rehashing cannot call back into user code.
//!
//! Cursor invalidation
//! - Growth relocates every node to a fresh generational key, so cursors
//!   issued before a growth-triggering insert go stale: their accessors
//!   return `None` and traversal from them falls to the end sentinel.
//!   Inserts that do not grow the table invalidate nothing.
//!
//! Failure model
//! - Growing the bucket array is the one fallible allocation
//!   (`Vec::try_reserve_exact`); its failure surfaces as
//!   `InsertError::Grow` and leaves the map untouched. Misuse, such as
//!   reading through the end sentinel or a stale cursor, is a checked `None`,
//!   never undefined behavior.
//!
//! Notes and non-goals
//! - Not thread-safe and never will be; wrap it externally if you must.
//! - No `Extend`/`FromIterator`: insert is fallible and those traits would
//!   have to swallow the error.
//! - Whole-map move and swap are ordinary Rust moves plus `mem::take` /
//!   `mem::swap` (the map implements `Default` without allocating).

pub mod chain_map;
mod chain_map_proptest;
mod guard;

// Public surface
pub use chain_map::{ChainMap, Cursor, InsertError, Iter, IterMut};
