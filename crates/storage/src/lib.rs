//! Realty Storage
//!
//! Short-lived in-memory caches backing the dictionary and media lookups.
//! Nothing is persisted; entries live for a configured TTL only.

pub mod memory_store;

pub use memory_store::TtlCache;
