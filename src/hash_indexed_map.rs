//! HashIndexedMap: digest-routed storage with collision refusal.
//!
//! Entries live in a `SlotMap` and a `HashTable` of slot keys routes by a
//! `u64` derived from each entry's digest. At most one entry exists per
//! digest. When a lookup lands on an entry whose key is not equal to the
//! probe key, the operation fails with `HashCollision` before touching
//! anything.
//!
//! Every entry stores its digest and route hash, so growing the table
//! never calls back into the user's hash function.

use crate::digest::{Digest, KeyHasher, StdKeyHasher};
use crate::error::MapError;
use crate::map::Map;
use core::fmt;
use core::hash::BuildHasher;
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

/// Stable reference to a live entry. Invalidated when the entry is removed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct Handle(DefaultKey);

#[derive(Clone, Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    digest: Digest,
    route: u64,
}

/// Outcome of routing a key to its slot.
enum Probe {
    Occupied(DefaultKey),
    Vacant { digest: Digest, route: u64 },
}

#[derive(Clone)]
pub struct HashIndexedMap<K, V, H = StdKeyHasher> {
    hasher: H,
    router: RandomState,
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Entry<K, V>>,
}

impl<K: fmt::Debug, V: fmt::Debug, H> fmt::Debug for HashIndexedMap<K, V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.slots.values().map(|e| (&e.key, &e.value)))
            .finish()
    }
}

impl<K, V> HashIndexedMap<K, V>
where
    K: Eq + core::hash::Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(StdKeyHasher::default())
    }
}

impl<K, V> Default for HashIndexedMap<K, V>
where
    K: Eq + core::hash::Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over `(&K, &V)` in storage order.
pub struct Iter<'a, K, V> {
    it: slotmap::basic::Iter<'a, DefaultKey, Entry<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, e)| (&e.key, &e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

/// Owned-entry iterator backing [`Map::seq`].
pub struct Seq<'a, K, V> {
    it: Iter<'a, K, V>,
}

impl<'a, K: Clone, V: Clone> Iterator for Seq<'a, K, V> {
    type Item = (K, V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(k, v)| (k.clone(), v.clone()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K, V, H> HashIndexedMap<K, V, H>
where
    K: Eq,
    H: KeyHasher<K>,
{
    pub fn with_hasher(hasher: H) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: H) -> Self {
        Self {
            hasher,
            router: RandomState::new(),
            index: HashTable::with_capacity(capacity),
            slots: SlotMap::with_capacity_and_key(capacity),
        }
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn probe(&self, key: &K) -> Result<Probe, MapError> {
        let digest = self.hasher.digest(key).map_err(MapError::Hashing)?;
        let route = self.router.hash_one(&digest);
        let found = self.index.find(route, |&k| {
            self.slots
                .get(k)
                .map(|e| e.digest == digest)
                .unwrap_or(false)
        });
        match found.and_then(|&k| self.slots.get(k).map(|e| (k, e))) {
            None => Ok(Probe::Vacant { digest, route }),
            Some((k, e)) if e.key == *key => Ok(Probe::Occupied(k)),
            Some(_) => {
                log::debug!("rejecting key: digest {} already holds a different key", digest);
                Err(MapError::HashCollision { digest })
            }
        }
    }

    pub fn contains_key(&self, key: &K) -> Result<bool, MapError> {
        Ok(matches!(self.probe(key)?, Probe::Occupied(_)))
    }

    pub fn get_ref(&self, key: &K) -> Result<Option<&V>, MapError> {
        match self.probe(key)? {
            Probe::Occupied(k) => Ok(self.slots.get(k).map(|e| &e.value)),
            Probe::Vacant { .. } => Ok(None),
        }
    }

    pub fn get_mut(&mut self, key: &K) -> Result<Option<&mut V>, MapError> {
        match self.probe(key)? {
            Probe::Occupied(k) => Ok(self.slots.get_mut(k).map(|e| &mut e.value)),
            Probe::Vacant { .. } => Ok(None),
        }
    }

    /// Insert or update; returns the entry's handle and the replaced value.
    pub(crate) fn upsert(&mut self, key: K, value: V) -> Result<(Handle, Option<V>), MapError> {
        match self.probe(&key)? {
            Probe::Occupied(k) => {
                let prev = self
                    .slots
                    .get_mut(k)
                    .map(|e| core::mem::replace(&mut e.value, value));
                Ok((Handle(k), prev))
            }
            Probe::Vacant { digest, route } => {
                let k = self.slots.insert(Entry {
                    key,
                    value,
                    digest,
                    route,
                });
                let slots = &self.slots;
                self.index
                    .insert_unique(route, k, |&kk| slots.get(kk).map(|e| e.route).unwrap_or(0));
                Ok((Handle(k), None))
            }
        }
    }

    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, MapError> {
        self.upsert(key, value).map(|(_, prev)| prev)
    }

    /// Remove by key; returns the handle the entry had and its value.
    pub(crate) fn take(&mut self, key: &K) -> Result<Option<(Handle, V)>, MapError> {
        let k = match self.probe(key)? {
            Probe::Occupied(k) => k,
            Probe::Vacant { .. } => return Ok(None),
        };
        let Some(entry) = self.slots.remove(k) else {
            return Ok(None);
        };
        // Unlink from the index.
        let unlinked = self
            .index
            .find_entry(entry.route, |&kk| kk == k)
            .map(|occupied| {
                occupied.remove();
            });
        debug_assert!(unlinked.is_ok(), "live entry missing from the route index");
        Ok(Some((Handle(k), entry.value)))
    }

    pub fn remove(&mut self, key: &K) -> Result<Option<V>, MapError> {
        self.take(key).map(|r| r.map(|(_, v)| v))
    }

    /// Drops the backing store wholesale.
    pub fn clear(&mut self) {
        log::trace!("clearing {} entries", self.slots.len());
        self.index = HashTable::new();
        self.slots = SlotMap::with_key();
    }

    pub(crate) fn resolve(&self, h: Handle) -> Option<(&K, &V)> {
        self.slots.get(h.0).map(|e| (&e.key, &e.value))
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.slots.iter(),
        }
    }
}

impl<K, V, H> Map for HashIndexedMap<K, V, H>
where
    K: Eq + Clone,
    V: Clone,
    H: KeyHasher<K> + Clone,
{
    type Key = K;
    type Value = V;
    type Seq<'a>
        = Seq<'a, K, V>
    where
        Self: 'a;

    fn empty_like(&self) -> Self {
        Self::with_hasher(self.hasher.clone())
    }

    fn get(&self, key: &K) -> Result<Option<V>, MapError> {
        Ok(self.get_ref(key)?.cloned())
    }

    fn add(&mut self, key: K, value: V) -> Result<Option<V>, MapError> {
        self.insert(key, value)
    }

    fn remove(&mut self, key: &K) -> Result<Option<V>, MapError> {
        HashIndexedMap::remove(self, key)
    }

    fn clear(&mut self) {
        HashIndexedMap::clear(self)
    }

    fn contains(&self, key: &K) -> Result<bool, MapError> {
        self.contains_key(key)
    }

    fn size(&self) -> usize {
        self.len()
    }

    fn seq(&self) -> Self::Seq<'_> {
        Seq { it: self.iter() }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::HashError;
    use std::collections::BTreeSet;

    /// Every key lands on the same digest.
    pub(crate) fn constant(_: &String) -> Result<Digest, HashError> {
        Ok(Digest::from(0u64))
    }

    /// Keys that are equal modulo 10 share a digest.
    pub(crate) fn mod_ten(k: &u32) -> Result<Digest, HashError> {
        Ok(Digest::from(u64::from(k % 10)))
    }

    /// Invariant: a colliding add fails and leaves the original entry intact.
    #[test]
    fn collision_refused_without_mutation() {
        let mut m = HashIndexedMap::with_hasher(constant);
        assert!(m.insert("key1".to_string(), "v1").unwrap().is_none());
        let err = m.insert("key2".to_string(), "v2").unwrap_err();
        assert!(err.is_collision());
        assert_eq!(m.len(), 1);
        assert_eq!(m.get_ref(&"key1".to_string()).unwrap(), Some(&"v1"));
    }

    /// Invariant: lookups and removals through a colliding key also fail.
    #[test]
    fn collision_surfaces_on_every_operation() {
        let mut m = HashIndexedMap::with_hasher(mod_ten);
        m.insert(3, "three").unwrap();
        assert!(m.contains_key(&13).unwrap_err().is_collision());
        assert!(m.get_ref(&23).unwrap_err().is_collision());
        assert!(m.remove(&33).unwrap_err().is_collision());
        assert_eq!(m.get_ref(&3).unwrap(), Some(&"three"));
        assert!(!m.contains_key(&4).unwrap());
    }

    /// Invariant: hash function failures are returned and nothing is stored.
    #[test]
    fn hashing_failure_propagates() {
        let failing = |k: &u32| -> Result<Digest, HashError> {
            if *k == 0 {
                Err("zero is not hashable".into())
            } else {
                Ok(Digest::from(u64::from(*k)))
            }
        };
        let mut m = HashIndexedMap::with_hasher(failing);
        m.insert(1, 1).unwrap();
        match m.insert(0, 0) {
            Err(MapError::Hashing(e)) => assert_eq!(e.to_string(), "zero is not hashable"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(m.len(), 1);
    }

    /// Invariant: updating a present key replaces the value in place.
    #[test]
    fn update_returns_previous_value() {
        let mut m: HashIndexedMap<String, i32> = HashIndexedMap::new();
        assert_eq!(m.insert("a".to_string(), 1).unwrap(), None);
        assert_eq!(m.insert("a".to_string(), 2).unwrap(), Some(1));
        assert_eq!(m.len(), 1);
        *m.get_mut(&"a".to_string()).unwrap().unwrap() += 10;
        assert_eq!(m.get_ref(&"a".to_string()).unwrap(), Some(&12));
    }

    /// Invariant: after `remove`, the digest slot is free for a new key.
    #[test]
    fn remove_frees_digest_for_other_key() {
        let mut m = HashIndexedMap::with_hasher(mod_ten);
        m.insert(7, "a").unwrap();
        assert_eq!(m.remove(&7).unwrap(), Some("a"));
        assert_eq!(m.remove(&7).unwrap(), None);
        m.insert(17, "b").unwrap();
        assert_eq!(m.get_ref(&17).unwrap(), Some(&"b"));
    }

    /// Invariant: entries survive index growth (routing uses stored hashes).
    #[test]
    fn growth_keeps_all_entries_reachable() {
        let mut m: HashIndexedMap<u32, u32> = HashIndexedMap::new();
        for i in 0..2_000 {
            m.insert(i, i * 2).unwrap();
        }
        for i in (0..2_000).step_by(3) {
            assert_eq!(m.remove(&i).unwrap(), Some(i * 2));
        }
        for i in 0..2_000 {
            assert_eq!(m.contains_key(&i).unwrap(), i % 3 != 0);
        }
        let keys: BTreeSet<u32> = m.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys.len(), m.len());
    }

    #[test]
    fn clear_resets() {
        let mut m: HashIndexedMap<u32, u32> = HashIndexedMap::new();
        m.insert(1, 1).unwrap();
        m.insert(2, 2).unwrap();
        m.clear();
        assert!(m.is_empty());
        assert!(!m.contains_key(&1).unwrap());
        m.insert(1, 5).unwrap();
        assert_eq!(m.get_ref(&1).unwrap(), Some(&5));
    }

    /// Invariant: the route index and the slot arena hold the same entries
    /// after any mix of inserts and removals.
    #[test]
    fn remove_unlinks_route_index() {
        let mut m = HashIndexedMap::with_hasher(mod_ten);
        for round in 0..3u32 {
            for k in 0..10 {
                m.insert(k + round * 10, k).unwrap();
            }
            for k in (0..10).step_by(2) {
                assert_eq!(m.remove(&(k + round * 10)).unwrap(), Some(k));
            }
            assert_eq!(m.index.len(), m.slots.len());
            for k in (1..10).step_by(2) {
                m.remove(&(k + round * 10)).unwrap();
            }
            assert_eq!(m.index.len(), 0);
            assert!(m.is_empty());
        }
    }

    #[test]
    fn seq_reports_exact_size() {
        let mut m: HashIndexedMap<u32, u32> = HashIndexedMap::new();
        for i in 0..5 {
            m.insert(i, i).unwrap();
        }
        let mut s = m.seq();
        assert_eq!(s.size_hint(), (5, Some(5)));
        s.next();
        assert_eq!(s.size_hint(), (4, Some(4)));
    }

    #[test]
    fn debug_lists_entries() {
        let mut m = HashIndexedMap::with_hasher(mod_ten);
        m.insert(7, "seven").unwrap();
        assert_eq!(format!("{:?}", m), r#"{7: "seven"}"#);
    }

    /// Invariant: a clone is independent of the original.
    #[test]
    fn clone_is_structural_copy() {
        let mut m: HashIndexedMap<u32, String> = HashIndexedMap::new();
        m.insert(1, "one".into()).unwrap();
        let mut c = m.clone();
        c.insert(2, "two".into()).unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(c.len(), 2);
        assert_eq!(Map::get(&c, &1).unwrap(), Some("one".to_string()));
    }
}
