//! Error taxonomy shared by every engine.

use crate::digest::Digest;
use thiserror::Error;

/// Failure raised by a key hash function. Propagated verbatim as the
/// `source()` of [`MapError::Hashing`].
pub type HashError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum MapError {
    /// Two keys that are not equal produced the same digest. The map is
    /// left exactly as it was before the call.
    #[error("hash collision: digest {digest} is occupied by a different key")]
    HashCollision { digest: Digest },
    /// The hash function itself failed.
    #[error("failed to hash key: {0}")]
    Hashing(#[source] HashError),
}

impl MapError {
    pub fn is_collision(&self) -> bool {
        matches!(self, MapError::HashCollision { .. })
    }
}
