//! The capability contract every engine and the guarded wrapper satisfy.
//!
//! Only `empty_like`, `get`, `add`, `remove`, `clear`, `contains`, `size`
//! and `seq` are engine-specific. Everything else is defined here in terms
//! of them, so set algebra and the derived containers behave identically
//! across engines and inherit each engine's collision contract.

use crate::error::MapError;

pub trait Map: Clone {
    type Key: Clone;
    type Value: Clone;

    /// Lazy iterator returned by [`Map::seq`].
    type Seq<'a>: Iterator<Item = (Self::Key, Self::Value)>
    where
        Self: 'a;

    /// A new, empty container of the same kind and configuration.
    fn empty_like(&self) -> Self;

    fn get(&self, key: &Self::Key) -> Result<Option<Self::Value>, MapError>;

    /// Insert or update. Returns the value that was replaced, if any.
    fn add(
        &mut self,
        key: Self::Key,
        value: Self::Value,
    ) -> Result<Option<Self::Value>, MapError>;

    /// Returns the removed value; `Ok(None)` when the key is absent.
    fn remove(&mut self, key: &Self::Key) -> Result<Option<Self::Value>, MapError>;

    fn clear(&mut self);

    fn contains(&self, key: &Self::Key) -> Result<bool, MapError>;

    fn size(&self) -> usize;

    /// Entries in the engine's iteration order. Dropping the iterator
    /// early stops the walk.
    fn seq(&self) -> Self::Seq<'_>;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn get_or_else(
        &self,
        key: &Self::Key,
        default: Self::Value,
    ) -> Result<Self::Value, MapError> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    fn keys(&self) -> impl Iterator<Item = Self::Key> {
        self.seq().map(|(k, _)| k)
    }

    fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Self::Key, &Self::Value),
    {
        for (k, v) in self.seq() {
            f(&k, &v);
        }
    }

    fn for_all<P>(&self, mut pred: P) -> bool
    where
        P: FnMut(&Self::Key, &Self::Value) -> bool,
    {
        self.seq().all(|(k, v)| pred(&k, &v))
    }

    fn exists<P>(&self, mut pred: P) -> bool
    where
        P: FnMut(&Self::Key, &Self::Value) -> bool,
    {
        self.seq().any(|(k, v)| pred(&k, &v))
    }

    fn find_first<P>(&self, mut pred: P) -> Option<(Self::Key, Self::Value)>
    where
        P: FnMut(&Self::Key, &Self::Value) -> bool,
    {
        self.seq().find(|(k, v)| pred(k, v))
    }

    /// Entries of `self` followed by entries of `other`; on a shared key the
    /// value from `other` wins. An ordered engine keeps the key's original
    /// position.
    fn union<O>(&self, other: &O) -> Result<Self, MapError>
    where
        O: Map<Key = Self::Key, Value = Self::Value>,
    {
        let mut out = self.clone();
        for (k, v) in other.seq() {
            out.add(k, v)?;
        }
        Ok(out)
    }

    /// Keys present in both, with values and order taken from `self`.
    fn intersection<O>(&self, other: &O) -> Result<Self, MapError>
    where
        O: Map<Key = Self::Key, Value = Self::Value>,
    {
        let mut out = self.empty_like();
        for (k, v) in self.seq() {
            if other.contains(&k)? {
                out.add(k, v)?;
            }
        }
        Ok(out)
    }

    fn filter<P>(&self, mut pred: P) -> Result<Self, MapError>
    where
        P: FnMut(&Self::Key, &Self::Value) -> bool,
    {
        let mut out = self.empty_like();
        for (k, v) in self.seq() {
            if pred(&k, &v) {
                out.add(k, v)?;
            }
        }
        Ok(out)
    }

    fn filter_not<P>(&self, mut pred: P) -> Result<Self, MapError>
    where
        P: FnMut(&Self::Key, &Self::Value) -> bool,
    {
        self.filter(|k, v| !pred(k, v))
    }

    /// Replays every entry through `f`. Later entries overwrite earlier ones
    /// when `f` maps two entries onto the same key.
    fn map<F>(&self, mut f: F) -> Result<Self, MapError>
    where
        F: FnMut(Self::Key, Self::Value) -> (Self::Key, Self::Value),
    {
        let mut out = self.empty_like();
        for (k, v) in self.seq() {
            let (k, v) = f(k, v);
            out.add(k, v)?;
        }
        Ok(out)
    }

    fn flat_map<F, I>(&self, mut f: F) -> Result<Self, MapError>
    where
        F: FnMut(Self::Key, Self::Value) -> I,
        I: IntoIterator<Item = (Self::Key, Self::Value)>,
    {
        let mut out = self.empty_like();
        for (k, v) in self.seq() {
            for (k, v) in f(k, v) {
                out.add(k, v)?;
            }
        }
        Ok(out)
    }
}

/// A [`Map`] whose `seq` follows first-insertion order.
pub trait OrderedMap: Map {
    /// `(insertion_index, entry)` pairs.
    fn indexed_seq(&self) -> core::iter::Enumerate<Self::Seq<'_>> {
        self.seq().enumerate()
    }
}
