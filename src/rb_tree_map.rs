//! RbTreeMap: red-black tree over an arena of nodes.
//!
//! Nodes live in a `SlotMap` and refer to each other through `NodeId`
//! handles. The arena owns every node; `parent` links are plain handles
//! used for rotations and fixups. Absent children count as black.
//!
//! Invariants after every public call:
//! - the root is black;
//! - no red node has a red child;
//! - every root-to-leaf path crosses the same number of black nodes;
//! - an in-order walk yields keys strictly increasing under the comparator.

use crate::compare::{Comparator, NaturalOrder};
use crate::error::MapError;
use crate::map::Map;
use core::cmp::Ordering;
use core::fmt;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    struct NodeId;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Color {
    Red,
    Black,
}

#[derive(Clone, Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    color: Color,
    left: Option<NodeId>,
    right: Option<NodeId>,
    parent: Option<NodeId>,
}

#[derive(Clone)]
pub struct RbTreeMap<K, V, C = NaturalOrder> {
    nodes: SlotMap<NodeId, Node<K, V>>,
    root: Option<NodeId>,
    cmp: C,
}

impl<K, V, C> fmt::Debug for RbTreeMap<K, V, C>
where
    K: fmt::Debug,
    V: fmt::Debug,
    C: Comparator<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord, V> RbTreeMap<K, V> {
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K: Ord, V> Default for RbTreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> RbTreeMap<K, V, C>
where
    C: Comparator<K>,
{
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
            cmp,
        }
    }

    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    /// Number of entries. The arena length doubles as a maintained counter.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    fn color(&self, n: Option<NodeId>) -> Color {
        n.and_then(|n| self.nodes.get(n))
            .map(|n| n.color)
            .unwrap_or(Color::Black)
    }

    fn set_color(&mut self, n: Option<NodeId>, color: Color) {
        if let Some(node) = n.and_then(|n| self.nodes.get_mut(n)) {
            node.color = color;
        }
    }

    fn left(&self, n: NodeId) -> Option<NodeId> {
        self.nodes.get(n).and_then(|n| n.left)
    }

    fn right(&self, n: NodeId) -> Option<NodeId> {
        self.nodes.get(n).and_then(|n| n.right)
    }

    fn parent(&self, n: NodeId) -> Option<NodeId> {
        self.nodes.get(n).and_then(|n| n.parent)
    }

    fn set_left(&mut self, n: NodeId, child: Option<NodeId>) {
        if let Some(node) = self.nodes.get_mut(n) {
            node.left = child;
        }
    }

    fn set_right(&mut self, n: NodeId, child: Option<NodeId>) {
        if let Some(node) = self.nodes.get_mut(n) {
            node.right = child;
        }
    }

    fn set_parent(&mut self, n: Option<NodeId>, parent: Option<NodeId>) {
        if let Some(node) = n.and_then(|n| self.nodes.get_mut(n)) {
            node.parent = parent;
        }
    }

    /// Point `parent`'s link that currently holds `old` at `new`; with no
    /// parent, `new` becomes the root.
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(p) if self.left(p) == Some(old) => self.set_left(p, new),
            Some(p) => self.set_right(p, new),
        }
    }

    fn find_node(&self, key: &K) -> Option<NodeId> {
        let mut cur = self.root;
        while let Some(n) = cur {
            let node = &self.nodes[n];
            cur = match self.cmp.compare(key, &node.key) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(n),
            };
        }
        None
    }

    fn minimum(&self, mut n: NodeId) -> NodeId {
        while let Some(l) = self.left(n) {
            n = l;
        }
        n
    }

    fn maximum(&self, mut n: NodeId) -> NodeId {
        while let Some(r) = self.right(n) {
            n = r;
        }
        n
    }

    fn rotate_left(&mut self, x: NodeId) {
        let Some(y) = self.right(x) else {
            return;
        };
        let y_left = self.left(y);
        self.set_right(x, y_left);
        self.set_parent(y_left, Some(x));
        let xp = self.parent(x);
        self.set_parent(Some(y), xp);
        self.replace_child(xp, x, Some(y));
        self.set_left(y, Some(x));
        self.set_parent(Some(x), Some(y));
    }

    fn rotate_right(&mut self, x: NodeId) {
        let Some(y) = self.left(x) else {
            return;
        };
        let y_right = self.right(y);
        self.set_left(x, y_right);
        self.set_parent(y_right, Some(x));
        let xp = self.parent(x);
        self.set_parent(Some(y), xp);
        self.replace_child(xp, x, Some(y));
        self.set_right(y, Some(x));
        self.set_parent(Some(x), Some(y));
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find_node(key).is_some()
    }

    pub fn get_ref(&self, key: &K) -> Option<&V> {
        self.find_node(key).map(|n| &self.nodes[n].value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let n = self.find_node(key)?;
        self.nodes.get_mut(n).map(|n| &mut n.value)
    }

    /// Insert or update; returns the replaced value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let mut parent = None;
        let mut went_left = false;
        let mut cur = self.root;
        while let Some(n) = cur {
            parent = Some(n);
            let node = &mut self.nodes[n];
            match self.cmp.compare(&key, &node.key) {
                Ordering::Less => {
                    went_left = true;
                    cur = node.left;
                }
                Ordering::Greater => {
                    went_left = false;
                    cur = node.right;
                }
                Ordering::Equal => return Some(core::mem::replace(&mut node.value, value)),
            }
        }

        let z = self.nodes.insert(Node {
            key,
            value,
            color: Color::Red,
            left: None,
            right: None,
            parent,
        });
        match parent {
            None => self.root = Some(z),
            Some(p) if went_left => self.set_left(p, Some(z)),
            Some(p) => self.set_right(p, Some(z)),
        }
        self.fixup_put(z);
        None
    }

    fn fixup_put(&mut self, mut z: NodeId) {
        while let Some(p) = self.parent(z) {
            if self.color(Some(p)) == Color::Black {
                break;
            }
            // A red parent is never the root, so the grandparent exists.
            let Some(g) = self.parent(p) else {
                break;
            };
            if self.left(g) == Some(p) {
                let uncle = self.right(g);
                if self.color(uncle) == Color::Red {
                    self.set_color(Some(p), Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(Some(g), Color::Red);
                    z = g;
                    continue;
                }
                if self.right(p) == Some(z) {
                    z = p;
                    self.rotate_left(z);
                }
                let Some(p) = self.parent(z) else { break };
                let Some(g) = self.parent(p) else { break };
                self.set_color(Some(p), Color::Black);
                self.set_color(Some(g), Color::Red);
                self.rotate_right(g);
            } else {
                let uncle = self.left(g);
                if self.color(uncle) == Color::Red {
                    self.set_color(Some(p), Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(Some(g), Color::Red);
                    z = g;
                    continue;
                }
                if self.left(p) == Some(z) {
                    z = p;
                    self.rotate_right(z);
                }
                let Some(p) = self.parent(z) else { break };
                let Some(g) = self.parent(p) else { break };
                self.set_color(Some(p), Color::Black);
                self.set_color(Some(g), Color::Red);
                self.rotate_left(g);
            }
        }
        self.set_color(self.root, Color::Black);
    }

    /// Removes `key`; a missing key is a no-op.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let z = self.find_node(key)?;
        let mut removed_color = self.nodes[z].color;
        // `x` moves into the spot vacated by the physically removed node;
        // `x_parent` tracks its parent since `x` may be absent.
        let x;
        let x_parent;

        match (self.left(z), self.right(z)) {
            (None, right) => {
                x = right;
                x_parent = self.parent(z);
                self.transplant(z, right);
            }
            (left, None) => {
                x = left;
                x_parent = self.parent(z);
                self.transplant(z, left);
            }
            (Some(zl), Some(zr)) => {
                let y = self.minimum(zr);
                removed_color = self.nodes[y].color;
                x = self.right(y);
                if self.parent(y) == Some(z) {
                    x_parent = Some(y);
                } else {
                    x_parent = self.parent(y);
                    self.transplant(y, x);
                    self.set_right(y, Some(zr));
                    self.set_parent(Some(zr), Some(y));
                }
                self.transplant(z, Some(y));
                self.set_left(y, Some(zl));
                self.set_parent(Some(zl), Some(y));
                let z_color = self.nodes[z].color;
                self.set_color(Some(y), z_color);
            }
        }

        let node = self.nodes.remove(z)?;
        if removed_color == Color::Black {
            self.fixup_delete(x, x_parent);
        }
        Some(node.value)
    }

    /// Replace the subtree rooted at `u` with the one rooted at `v`.
    fn transplant(&mut self, u: NodeId, v: Option<NodeId>) {
        let up = self.parent(u);
        self.replace_child(up, u, v);
        self.set_parent(v, up);
    }

    fn fixup_delete(&mut self, mut x: Option<NodeId>, mut parent: Option<NodeId>) {
        while x != self.root && self.color(x) == Color::Black {
            let Some(p) = parent else {
                break;
            };
            if self.left(p) == x {
                let mut w = self.right(p);
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(Some(p), Color::Red);
                    self.rotate_left(p);
                    w = self.right(p);
                }
                let Some(mut wn) = w else {
                    x = Some(p);
                    parent = self.parent(p);
                    continue;
                };
                if self.color(self.left(wn)) == Color::Black
                    && self.color(self.right(wn)) == Color::Black
                {
                    self.set_color(Some(wn), Color::Red);
                    x = Some(p);
                    parent = self.parent(p);
                } else {
                    if self.color(self.right(wn)) == Color::Black {
                        self.set_color(self.left(wn), Color::Black);
                        self.set_color(Some(wn), Color::Red);
                        self.rotate_right(wn);
                        match self.right(p) {
                            Some(n) => wn = n,
                            None => break,
                        }
                    }
                    let p_color = self.color(Some(p));
                    self.set_color(Some(wn), p_color);
                    self.set_color(Some(p), Color::Black);
                    self.set_color(self.right(wn), Color::Black);
                    self.rotate_left(p);
                    x = self.root;
                    parent = None;
                }
            } else {
                let mut w = self.left(p);
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(Some(p), Color::Red);
                    self.rotate_right(p);
                    w = self.left(p);
                }
                let Some(mut wn) = w else {
                    x = Some(p);
                    parent = self.parent(p);
                    continue;
                };
                if self.color(self.left(wn)) == Color::Black
                    && self.color(self.right(wn)) == Color::Black
                {
                    self.set_color(Some(wn), Color::Red);
                    x = Some(p);
                    parent = self.parent(p);
                } else {
                    if self.color(self.left(wn)) == Color::Black {
                        self.set_color(self.right(wn), Color::Black);
                        self.set_color(Some(wn), Color::Red);
                        self.rotate_left(wn);
                        match self.left(p) {
                            Some(n) => wn = n,
                            None => break,
                        }
                    }
                    let p_color = self.color(Some(p));
                    self.set_color(Some(wn), p_color);
                    self.set_color(Some(p), Color::Black);
                    self.set_color(self.left(wn), Color::Black);
                    self.rotate_right(p);
                    x = self.root;
                    parent = None;
                }
            }
        }
        self.set_color(x, Color::Black);
    }

    pub fn clear(&mut self) {
        log::trace!("clearing {} nodes", self.nodes.len());
        self.nodes = SlotMap::with_key();
        self.root = None;
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        let n = self.minimum(self.root?);
        self.nodes.get(n).map(|n| (&n.key, &n.value))
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        let n = self.maximum(self.root?);
        self.nodes.get(n).map(|n| (&n.key, &n.value))
    }

    /// In-order iterator; lazy, so stopping early skips the rest of the walk.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut it = Iter {
            nodes: &self.nodes,
            stack: Vec::new(),
            remaining: self.nodes.len(),
        };
        it.push_left(self.root);
        it
    }

    /// Checks every red-black invariant and returns the black-height.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> usize {
        fn walk<K, V, C: Comparator<K>>(
            t: &RbTreeMap<K, V, C>,
            n: Option<NodeId>,
            parent: Option<NodeId>,
        ) -> usize {
            let Some(id) = n else { return 1 };
            let node = &t.nodes[id];
            assert_eq!(node.parent, parent, "parent link out of sync");
            if node.color == Color::Red {
                assert_eq!(t.color(node.left), Color::Black, "red node with red left child");
                assert_eq!(t.color(node.right), Color::Black, "red node with red right child");
            }
            let lh = walk(t, node.left, Some(id));
            let rh = walk(t, node.right, Some(id));
            assert_eq!(lh, rh, "unequal black-height");
            lh + usize::from(node.color == Color::Black)
        }

        assert_eq!(self.color(self.root), Color::Black, "root must be black");
        let keys: Vec<&K> = self.iter().map(|(k, _)| k).collect();
        for w in keys.windows(2) {
            assert_eq!(self.cmp.compare(w[0], w[1]), Ordering::Less, "keys out of order");
        }
        assert_eq!(keys.len(), self.nodes.len(), "unreachable nodes in arena");
        walk(self, self.root, None)
    }
}

/// In-order iterator over `(&K, &V)`.
pub struct Iter<'a, K, V> {
    nodes: &'a SlotMap<NodeId, Node<K, V>>,
    stack: Vec<NodeId>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn push_left(&mut self, mut n: Option<NodeId>) {
        while let Some(id) = n {
            self.stack.push(id);
            n = self.nodes.get(id).and_then(|node| node.left);
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let nodes = self.nodes;
        let node = nodes.get(id)?;
        self.push_left(node.right);
        self.remaining = self.remaining.saturating_sub(1);
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
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

impl<K, V, C> Map for RbTreeMap<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparator<K> + Clone,
{
    type Key = K;
    type Value = V;
    type Seq<'a>
        = Seq<'a, K, V>
    where
        Self: 'a;

    fn empty_like(&self) -> Self {
        Self::with_comparator(self.cmp.clone())
    }

    fn get(&self, key: &K) -> Result<Option<V>, MapError> {
        Ok(self.get_ref(key).cloned())
    }

    fn add(&mut self, key: K, value: V) -> Result<Option<V>, MapError> {
        Ok(self.insert(key, value))
    }

    fn remove(&mut self, key: &K) -> Result<Option<V>, MapError> {
        Ok(RbTreeMap::remove(self, key))
    }

    fn clear(&mut self) {
        RbTreeMap::clear(self)
    }

    fn contains(&self, key: &K) -> Result<bool, MapError> {
        Ok(self.contains_key(key))
    }

    fn size(&self) -> usize {
        self.len()
    }

    fn seq(&self) -> Self::Seq<'_> {
        Seq { it: self.iter() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys<C: Comparator<i32>>(t: &RbTreeMap<i32, i32, C>) -> Vec<i32> {
        t.iter().map(|(k, _)| *k).collect()
    }

    /// Invariant: in-order walk yields keys sorted regardless of insert order.
    #[test]
    fn sorted_iteration() {
        let mut t = RbTreeMap::new();
        for k in [5, 2, 8, 1, 9, 3, 7, 4, 6] {
            assert!(t.insert(k, k * 10).is_none());
            t.check_invariants();
        }
        assert_eq!(keys(&t), [1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(t.len(), 9);
        assert_eq!(t.first(), Some((&1, &10)));
        assert_eq!(t.last(), Some((&9, &90)));
    }

    /// Invariant: ascending inserts (the worst case for a plain BST) stay balanced.
    #[test]
    fn ascending_inserts_stay_balanced() {
        let mut t = RbTreeMap::new();
        for k in 0..1_024 {
            t.insert(k, k);
        }
        let bh = t.check_invariants();
        // 1024 nodes fit within black-height log2(n + 1) + 1.
        assert!(bh <= 12, "black-height {} too large", bh);
    }

    /// Invariant: updating an existing key keeps one node and returns the old value.
    #[test]
    fn update_replaces_value() {
        let mut t = RbTreeMap::new();
        t.insert("k", 1);
        assert_eq!(t.insert("k", 2), Some(1));
        assert_eq!(t.len(), 1);
        *t.get_mut(&"k").unwrap() += 1;
        assert_eq!(t.get_ref(&"k"), Some(&3));
    }

    /// Invariant: removals of leaves, single-child and two-child nodes all
    /// keep the tree valid.
    #[test]
    fn remove_every_shape() {
        let mut t = RbTreeMap::new();
        for k in 0..64 {
            t.insert(k, k);
        }
        assert_eq!(t.remove(&100), None);
        for k in (0..64).step_by(2) {
            assert_eq!(t.remove(&k), Some(k));
            t.check_invariants();
        }
        assert_eq!(keys(&t), (1..64).step_by(2).collect::<Vec<_>>());
        for k in (1..64).step_by(2).rev() {
            assert_eq!(t.remove(&k), Some(k));
            t.check_invariants();
        }
        assert!(t.is_empty());
        assert_eq!(t.len(), 0);
        assert_eq!(t.first(), None);
    }

    /// Invariant: a custom comparator defines both order and key identity.
    #[test]
    fn custom_comparator_reverses_order() {
        let mut t = RbTreeMap::with_comparator(|a: &i32, b: &i32| b.cmp(a));
        for k in [3, 1, 2] {
            t.insert(k, 0);
        }
        t.check_invariants();
        assert_eq!(keys(&t), [3, 2, 1]);
    }

    #[test]
    fn iteration_stops_early() {
        let mut t = RbTreeMap::new();
        for k in 0..100 {
            t.insert(k, ());
        }
        let firsts: Vec<i32> = t.iter().map(|(k, _)| *k).take(3).collect();
        assert_eq!(firsts, [0, 1, 2]);
    }

    /// Invariant: the in-order iterator knows exactly how many entries remain.
    #[test]
    fn iter_size_hint_is_exact() {
        let mut t = RbTreeMap::new();
        for k in [4, 1, 3, 2] {
            t.insert(k, k);
        }
        t.remove(&3);
        let mut it = t.seq();
        assert_eq!(it.size_hint(), (3, Some(3)));
        it.next();
        it.next();
        assert_eq!(it.size_hint(), (1, Some(1)));
        it.next();
        assert_eq!(it.size_hint(), (0, Some(0)));
        assert_eq!(it.next(), None);
    }

    #[test]
    fn debug_is_sorted() {
        let mut t = RbTreeMap::new();
        t.insert(2, "b");
        t.insert(1, "a");
        assert_eq!(format!("{:?}", t), r#"{1: "a", 2: "b"}"#);
    }

    #[test]
    fn clear_then_reuse() {
        let mut t = RbTreeMap::new();
        t.insert(1, 1);
        t.insert(2, 2);
        t.clear();
        assert!(t.is_empty());
        assert!(!t.contains_key(&1));
        t.insert(3, 3);
        t.check_invariants();
        assert_eq!(keys(&t), [3]);
    }

    /// Invariant: the tree engine never reports an error through the contract.
    #[test]
    fn contract_operations_are_infallible() {
        let mut t: RbTreeMap<i32, &str> = RbTreeMap::new();
        assert_eq!(Map::add(&mut t, 1, "a").unwrap(), None);
        assert!(Map::contains(&t, &1).unwrap());
        assert_eq!(Map::get(&t, &1).unwrap(), Some("a"));
        assert_eq!(Map::remove(&mut t, &1).unwrap(), Some("a"));
        assert_eq!(Map::size(&t), 0);
    }
}
