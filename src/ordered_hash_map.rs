//! OrderedHashMap: HashIndexedMap plus a first-insertion order index.
//!
//! The order index holds entry handles. Updating a present key keeps its
//! position, a new key is appended, and removal splices exactly one
//! handle out of the index (linear scan).

use crate::digest::{KeyHasher, StdKeyHasher};
use crate::error::MapError;
use crate::hash_indexed_map::{Handle, HashIndexedMap};
use crate::map::{Map, OrderedMap};
use core::fmt;

#[derive(Clone)]
pub struct OrderedHashMap<K, V, H = StdKeyHasher> {
    table: HashIndexedMap<K, V, H>,
    order: Vec<Handle>,
}

impl<K, V, H> fmt::Debug for OrderedHashMap<K, V, H>
where
    K: Eq + fmt::Debug,
    V: fmt::Debug,
    H: KeyHasher<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> OrderedHashMap<K, V>
where
    K: Eq + core::hash::Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(StdKeyHasher::default())
    }
}

impl<K, V> Default for OrderedHashMap<K, V>
where
    K: Eq + core::hash::Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over `(&K, &V)` in insertion order.
pub struct Iter<'a, K, V, H> {
    table: &'a HashIndexedMap<K, V, H>,
    order: core::slice::Iter<'a, Handle>,
}

impl<'a, K, V, H> Iterator for Iter<'a, K, V, H>
where
    K: Eq,
    H: KeyHasher<K>,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let table = self.table;
        // A handle that no longer resolves is skipped.
        self.order.by_ref().find_map(|&h| table.resolve(h))
    }

    // Every handle in the order index resolves while the map is borrowed.
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

/// Owned-entry iterator backing [`Map::seq`].
pub struct Seq<'a, K, V, H> {
    it: Iter<'a, K, V, H>,
}

impl<'a, K, V, H> Iterator for Seq<'a, K, V, H>
where
    K: Eq + Clone,
    V: Clone,
    H: KeyHasher<K>,
{
    type Item = (K, V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(k, v)| (k.clone(), v.clone()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K, V, H> OrderedHashMap<K, V, H>
where
    K: Eq,
    H: KeyHasher<K>,
{
    pub fn with_hasher(hasher: H) -> Self {
        Self {
            table: HashIndexedMap::with_hasher(hasher),
            order: Vec::new(),
        }
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: H) -> Self {
        Self {
            table: HashIndexedMap::with_capacity_and_hasher(capacity, hasher),
            order: Vec::with_capacity(capacity),
        }
    }

    pub fn hasher(&self) -> &H {
        self.table.hasher()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> Result<bool, MapError> {
        self.table.contains_key(key)
    }

    pub fn get_ref(&self, key: &K) -> Result<Option<&V>, MapError> {
        self.table.get_ref(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Result<Option<&mut V>, MapError> {
        self.table.get_mut(key)
    }

    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, MapError> {
        let (handle, prev) = self.table.upsert(key, value)?;
        if prev.is_none() {
            self.order.push(handle);
        }
        Ok(prev)
    }

    pub fn remove(&mut self, key: &K) -> Result<Option<V>, MapError> {
        let Some((handle, value)) = self.table.take(key)? else {
            return Ok(None);
        };
        if let Some(pos) = self.order.iter().position(|&h| h == handle) {
            self.order.remove(pos);
        }
        debug_assert_eq!(self.order.len(), self.table.len());
        Ok(Some(value))
    }

    pub fn clear(&mut self) {
        self.table.clear();
        self.order = Vec::new();
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        self.iter().next()
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        self.order
            .iter()
            .rev()
            .find_map(|&h| self.table.resolve(h))
    }

    pub fn iter(&self) -> Iter<'_, K, V, H> {
        Iter {
            table: &self.table,
            order: self.order.iter(),
        }
    }
}

impl<K, V, H> Map for OrderedHashMap<K, V, H>
where
    K: Eq + Clone,
    V: Clone,
    H: KeyHasher<K> + Clone,
{
    type Key = K;
    type Value = V;
    type Seq<'a>
        = Seq<'a, K, V, H>
    where
        Self: 'a;

    fn empty_like(&self) -> Self {
        Self::with_hasher(self.hasher().clone())
    }

    fn get(&self, key: &K) -> Result<Option<V>, MapError> {
        Ok(self.get_ref(key)?.cloned())
    }

    fn add(&mut self, key: K, value: V) -> Result<Option<V>, MapError> {
        self.insert(key, value)
    }

    fn remove(&mut self, key: &K) -> Result<Option<V>, MapError> {
        OrderedHashMap::remove(self, key)
    }

    fn clear(&mut self) {
        OrderedHashMap::clear(self)
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

impl<K, V, H> OrderedMap for OrderedHashMap<K, V, H>
where
    K: Eq + Clone,
    V: Clone,
    H: KeyHasher<K> + Clone,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_indexed_map::tests::mod_ten;

    fn keys<H: KeyHasher<String>>(m: &OrderedHashMap<String, i32, H>) -> Vec<&str> {
        m.iter().map(|(k, _)| k.as_str()).collect()
    }

    /// Invariant: updating a present key never moves it.
    #[test]
    fn update_keeps_position_and_remove_splices() {
        let mut m: OrderedHashMap<String, i32> = OrderedHashMap::new();
        for (i, k) in ["a", "b", "c"].iter().enumerate() {
            m.insert(k.to_string(), i as i32).unwrap();
        }
        assert_eq!(m.insert("b".to_string(), 42).unwrap(), Some(1));
        assert_eq!(keys(&m), ["a", "b", "c"]);
        assert_eq!(m.get_ref(&"b".to_string()).unwrap(), Some(&42));

        assert_eq!(m.remove(&"b".to_string()).unwrap(), Some(42));
        assert_eq!(keys(&m), ["a", "c"]);
    }

    /// Invariant: a removed then re-added key goes to the end.
    #[test]
    fn reinsert_appends() {
        let mut m: OrderedHashMap<String, i32> = OrderedHashMap::new();
        for k in ["x", "y", "z"] {
            m.insert(k.to_string(), 0).unwrap();
        }
        m.remove(&"x".to_string()).unwrap();
        m.insert("x".to_string(), 1).unwrap();
        assert_eq!(keys(&m), ["y", "z", "x"]);
        assert_eq!(m.first().map(|(k, _)| k.as_str()), Some("y"));
        assert_eq!(m.last().map(|(k, _)| k.as_str()), Some("x"));
    }

    /// Invariant: a rejected collision leaves the order index untouched.
    #[test]
    fn collision_does_not_touch_order() {
        let mut m = OrderedHashMap::with_hasher(mod_ten);
        m.insert(1, "one").unwrap();
        m.insert(2, "two").unwrap();
        assert!(m.insert(11, "eleven").unwrap_err().is_collision());
        assert!(m.remove(&12).unwrap_err().is_collision());
        let ks: Vec<u32> = m.iter().map(|(k, _)| *k).collect();
        assert_eq!(ks, [1, 2]);
    }

    #[test]
    fn indexed_seq_counts_positions() {
        let mut m: OrderedHashMap<String, i32> = OrderedHashMap::new();
        m.insert("p".into(), 1).unwrap();
        m.insert("q".into(), 2).unwrap();
        let got: Vec<(usize, (String, i32))> = m.indexed_seq().collect();
        assert_eq!(got, vec![(0, ("p".into(), 1)), (1, ("q".into(), 2))]);
    }

    #[test]
    fn seq_size_hint_tracks_remaining() {
        let mut m: OrderedHashMap<String, i32> = OrderedHashMap::new();
        for k in ["a", "b", "c"] {
            m.insert(k.into(), 0).unwrap();
        }
        m.remove(&"b".to_string()).unwrap();
        let mut s = m.seq();
        assert_eq!(s.size_hint(), (2, Some(2)));
        s.next();
        assert_eq!(s.size_hint(), (1, Some(1)));
        s.next();
        assert_eq!(s.size_hint(), (0, Some(0)));
        assert_eq!(s.next(), None);
    }

    #[test]
    fn debug_follows_insertion_order() {
        let mut m: OrderedHashMap<&str, i32> = OrderedHashMap::new();
        m.insert("b", 2).unwrap();
        m.insert("a", 1).unwrap();
        assert_eq!(format!("{:?}", m), r#"{"b": 2, "a": 1}"#);
    }

    #[test]
    fn clear_empties_order() {
        let mut m: OrderedHashMap<String, i32> = OrderedHashMap::new();
        m.insert("a".into(), 1).unwrap();
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.iter().count(), 0);
        m.insert("b".into(), 2).unwrap();
        assert_eq!(keys(&m), ["b"]);
    }
}
