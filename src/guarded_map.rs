//! GuardedMap: reader/writer-locked wrapper around any engine.
//!
//! Locking discipline:
//! - `add`/`remove`/`clear` hold the write lock for the inner call.
//! - `get`/`contains`/`size` hold the read lock for the inner call.
//! - Anything that runs caller code per entry (`seq` and the contract's
//!   `for_each`, `for_all`, `exists`, `find_first`, set algebra and the
//!   derived containers, which all go through `seq`) copies the entries
//!   into a buffer under the read lock and iterates the buffer after the
//!   lock is released. Caller code never runs under the lock, and the view
//!   is a point-in-time snapshot.
//!
//! The `other` operand of `union`/`intersection` is read without taking any
//! lock on behalf of `self`.
//!
//! Re-entering the same wrapper from code that runs while its write lock is
//! held (a key's `Eq`/`Hash`/`Drop`, a hash function, a comparator)
//! deadlocks.

use crate::error::MapError;
use crate::hash_indexed_map::HashIndexedMap;
use crate::map::{Map, OrderedMap};
use crate::ordered_hash_map::OrderedHashMap;
use crate::rb_tree_map::RbTreeMap;
use parking_lot::RwLock;

#[derive(Debug)]
pub struct GuardedMap<M> {
    inner: RwLock<M>,
}

impl<M> GuardedMap<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner: RwLock::new(inner),
        }
    }

    pub fn into_inner(self) -> M {
        self.inner.into_inner()
    }
}

impl<M: Map> GuardedMap<M> {
    pub fn add(&self, key: M::Key, value: M::Value) -> Result<Option<M::Value>, MapError> {
        self.inner.write().add(key, value)
    }

    pub fn remove(&self, key: &M::Key) -> Result<Option<M::Value>, MapError> {
        self.inner.write().remove(key)
    }

    pub fn clear(&self) {
        self.inner.write().clear()
    }

    pub fn get(&self, key: &M::Key) -> Result<Option<M::Value>, MapError> {
        self.inner.read().get(key)
    }

    pub fn contains(&self, key: &M::Key) -> Result<bool, MapError> {
        self.inner.read().contains(key)
    }

    pub fn size(&self) -> usize {
        self.inner.read().size()
    }

    /// Copy of every entry, in the inner engine's order, taken under one
    /// read lock.
    pub fn snapshot(&self) -> Vec<(M::Key, M::Value)> {
        let guard = self.inner.read();
        let mut buf = Vec::with_capacity(guard.size());
        buf.extend(guard.seq());
        buf
    }

    /// Iterates a snapshot; concurrent writers do not affect it.
    pub fn seq(&self) -> std::vec::IntoIter<(M::Key, M::Value)> {
        self.snapshot().into_iter()
    }
}

impl<M: Clone> Clone for GuardedMap<M> {
    /// Clones the inner engine under the read lock into a fresh wrapper.
    fn clone(&self) -> Self {
        Self::new(self.inner.read().clone())
    }
}

impl<M: Default> Default for GuardedMap<M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

impl<M: Map> Map for GuardedMap<M> {
    type Key = M::Key;
    type Value = M::Value;
    type Seq<'a>
        = std::vec::IntoIter<(M::Key, M::Value)>
    where
        Self: 'a;

    fn empty_like(&self) -> Self {
        Self::new(self.inner.read().empty_like())
    }

    fn get(&self, key: &M::Key) -> Result<Option<M::Value>, MapError> {
        GuardedMap::get(self, key)
    }

    // `&mut self` already proves exclusive access, so the lock is bypassed.
    fn add(&mut self, key: M::Key, value: M::Value) -> Result<Option<M::Value>, MapError> {
        self.inner.get_mut().add(key, value)
    }

    fn remove(&mut self, key: &M::Key) -> Result<Option<M::Value>, MapError> {
        self.inner.get_mut().remove(key)
    }

    fn clear(&mut self) {
        self.inner.get_mut().clear()
    }

    fn contains(&self, key: &M::Key) -> Result<bool, MapError> {
        GuardedMap::contains(self, key)
    }

    fn size(&self) -> usize {
        GuardedMap::size(self)
    }

    fn seq(&self) -> Self::Seq<'_> {
        GuardedMap::seq(self)
    }
}

impl<M: OrderedMap> OrderedMap for GuardedMap<M> {}

/// Wraps a container in a [`GuardedMap`]. A container that is already
/// guarded is returned unchanged, never wrapped twice.
pub trait IntoGuarded: Sized {
    type Guarded;

    fn into_guarded(self) -> Self::Guarded;
}

impl<M> IntoGuarded for GuardedMap<M> {
    type Guarded = Self;

    fn into_guarded(self) -> Self {
        self
    }
}

impl<K, V, H> IntoGuarded for HashIndexedMap<K, V, H> {
    type Guarded = GuardedMap<Self>;

    fn into_guarded(self) -> GuardedMap<Self> {
        GuardedMap::new(self)
    }
}

impl<K, V, H> IntoGuarded for OrderedHashMap<K, V, H> {
    type Guarded = GuardedMap<Self>;

    fn into_guarded(self) -> GuardedMap<Self> {
        GuardedMap::new(self)
    }
}

impl<K, V, C> IntoGuarded for RbTreeMap<K, V, C> {
    type Guarded = GuardedMap<Self>;

    fn into_guarded(self) -> GuardedMap<Self> {
        GuardedMap::new(self)
    }
}
