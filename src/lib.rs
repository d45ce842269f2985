//! keyed-maps: associative containers over keys that only promise a digest
//! or a total order, sharing one [`Map`] contract.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: interchangeable engines behind one contract, each of which
//!   refuses to lose data silently.
//! - Layers:
//!   - HashIndexedMap<K, V, H>: entries in a `SlotMap`, routed by the
//!     key's digest through a `HashTable` of slot keys. One entry per
//!     digest; a digest shared by unequal keys is a `HashCollision`.
//!   - OrderedHashMap<K, V, H>: HashIndexedMap plus a vector of entry
//!     handles recording first-insertion order.
//!   - RbTreeMap<K, V, C>: red-black tree whose nodes live in a `SlotMap`
//!     arena and link to each other through handles.
//!   - GuardedMap<M>: any of the above behind a `parking_lot::RwLock`,
//!     with snapshot iteration.
//!
//! Contract
//! - `Map` declares the eight engine-specific operations; everything else
//!   (`union`, `intersection`, `filter`, `map`, `flat_map`, ...) is a
//!   default method built from `empty_like`, `add` and `seq`, so derived
//!   containers inherit the engine's collision checks.
//! - Derived containers are always freshly built and abort on the first
//!   error; a partial result is never returned.
//! - `Clone` is structural: the arena, index and order vectors are copied
//!   as they are, so cloning never re-hashes and cannot fail.
//!
//! Key capabilities
//! - Hash engines take a [`KeyHasher`] (`K -> Result<Digest, HashError>`)
//!   and use `K: Eq` as the authoritative identity.
//! - The tree takes a [`Comparator`]; it never hashes, so it never fails.
//!
//! Concurrency
//! - Engines have no internal synchronization. Share them across threads
//!   only through `GuardedMap` (or your own lock).
//! - `GuardedMap` never runs caller code while holding its lock:
//!   callback-driven operations copy the entries out first.
//! - Re-entering a `GuardedMap` from code that runs under its write lock
//!   (a key's `Eq`, `Hash` or `Drop`, a hash function, a comparator)
//!   deadlocks. This is not detected.
//!
//! Logging
//! - Emitted through the `log` facade: rejected collisions at `debug`,
//!   `clear` at `trace`. Install any `log` backend to see them.

pub mod compare;
pub mod digest;
pub mod error;
pub mod guarded_map;
pub mod hash_indexed_map;
mod hash_indexed_map_proptest;
pub mod map;
pub mod ordered_hash_map;
pub mod rb_tree_map;
mod rb_tree_map_proptest;

// Public surface
pub use compare::{Comparator, NaturalOrder};
pub use digest::{Digest, Hashable, HashableKeyHasher, KeyHasher, StdKeyHasher};
pub use error::{HashError, MapError};
pub use guarded_map::{GuardedMap, IntoGuarded};
pub use hash_indexed_map::HashIndexedMap;
pub use map::{Map, OrderedMap};
pub use ordered_hash_map::OrderedHashMap;
pub use rb_tree_map::RbTreeMap;
