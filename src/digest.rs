//! Digests and the key hashing capability.
//!
//! A hash engine never hashes keys itself; it asks a [`KeyHasher`] for a
//! [`Digest`] and routes on that. Digest equality only decides where an
//! entry lives. Whether two keys are the same is always decided by `K: Eq`.

use crate::error::HashError;
use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use std::collections::hash_map::RandomState;
use std::io;

/// Fixed-form output of hashing a key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(Box<[u8]>);

impl Digest {
    pub fn from_bytes(bytes: impl Into<Box<[u8]>>) -> Self {
        Digest(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<u64> for Digest {
    fn from(h: u64) -> Self {
        Digest::from_bytes(h.to_be_bytes().to_vec())
    }
}

impl From<&[u8]> for Digest {
    fn from(b: &[u8]) -> Self {
        Digest::from_bytes(b.to_vec())
    }
}

impl From<Vec<u8>> for Digest {
    fn from(b: Vec<u8>) -> Self {
        Digest::from_bytes(b)
    }
}

impl From<&str> for Digest {
    fn from(s: &str) -> Self {
        Digest::from(s.as_bytes())
    }
}

impl From<String> for Digest {
    fn from(s: String) -> Self {
        Digest::from(s.into_bytes())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0.iter() {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

/// Hash function used by the hash engines: `K -> Result<Digest, HashError>`.
pub trait KeyHasher<K: ?Sized> {
    fn digest(&self, key: &K) -> Result<Digest, HashError>;
}

impl<K, F> KeyHasher<K> for F
where
    K: ?Sized,
    F: Fn(&K) -> Result<Digest, HashError>,
{
    #[inline]
    fn digest(&self, key: &K) -> Result<Digest, HashError> {
        self(key)
    }
}

/// Infallible digests for `K: Hash` through a `BuildHasher`.
#[derive(Clone, Debug, Default)]
pub struct StdKeyHasher<S = RandomState> {
    build: S,
}

impl<S> StdKeyHasher<S> {
    pub fn with_build_hasher(build: S) -> Self {
        Self { build }
    }
}

impl<K, S> KeyHasher<K> for StdKeyHasher<S>
where
    K: ?Sized + Hash,
    S: BuildHasher,
{
    #[inline]
    fn digest(&self, key: &K) -> Result<Digest, HashError> {
        Ok(Digest::from(self.build.hash_one(key)))
    }
}

/// Key capability: write a canonical form of `self` into a hashing context.
///
/// Unlike `Hash`, writing may fail; the failure surfaces as
/// [`MapError::Hashing`](crate::MapError::Hashing).
pub trait Hashable {
    fn hash_into(&self, ctx: &mut dyn io::Write) -> io::Result<()>;
}

/// Hashing context handed to [`Hashable::hash_into`].
struct HasherWriter<H>(H);

impl<H: Hasher> io::Write for HasherWriter<H> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Digests for any [`Hashable`] key.
#[derive(Clone, Debug, Default)]
pub struct HashableKeyHasher<S = RandomState> {
    build: S,
}

impl<S> HashableKeyHasher<S> {
    pub fn with_build_hasher(build: S) -> Self {
        Self { build }
    }
}

impl<K, S> KeyHasher<K> for HashableKeyHasher<S>
where
    K: ?Sized + Hashable,
    S: BuildHasher,
{
    fn digest(&self, key: &K) -> Result<Digest, HashError> {
        let mut ctx = HasherWriter(self.build.build_hasher());
        key.hash_into(&mut ctx)?;
        Ok(Digest::from(ctx.0.finish()))
    }
}
