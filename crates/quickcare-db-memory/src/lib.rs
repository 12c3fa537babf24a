//! In-memory storage backend for the Quickcare server.
//!
//! Backs the storage traits with `tokio::sync::RwLock`-guarded hash maps.
//! Holding the appointment map's write lock across the slot-conflict check
//! and the insert makes the booking invariant atomic.

mod query;
mod storage;

pub use storage::MemoryStorage;
