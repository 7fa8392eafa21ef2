use core::hash::Hash;
use std::hash::Hasher;

#[cfg(feature = "std-hash")]
pub mod default {
    pub use std::collections::hash_map::DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::new()
    }
}

#[cfg(not(feature = "std-hash"))]
pub mod default {
    pub use ahash::AHasher as DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::default()
    }
}

/// Identity of a keyed element among its siblings.
pub type Key = u64;

/// Hashes any key value with the active hasher.
#[inline]
pub fn key_of<T: Hash + ?Sized>(value: &T) -> Key {
    let mut hasher = default::new();
    value.hash(&mut hasher);
    hasher.finish()
}
