//! Keyed artifact cache for the Gantry CI engine.
//!
//! Keys are content-derived (toolchain fingerprint + lockfile fingerprint),
//! so a changed toolchain or changed dependency set automatically invalidates
//! stale entries; there is no explicit invalidation API. Every cache failure
//! is non-fatal: a restore error is a miss, a save error is a logged no-op.

pub mod error;
pub mod key;
pub mod manager;
pub mod store;

pub use error::CacheError;
pub use key::CacheKey;
pub use manager::CacheManager;
pub use store::{CacheStore, LocalDiskStore};
