// Caching layer for rendered product fragments
// Two tiers: a process-wide memory map and a session-scoped key/value store

pub mod clock;
pub mod entry;
pub mod sqlite;
pub mod storage;
pub mod tier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use sqlite::SqliteStorage;
pub use storage::{MemoryStorage, Storage, StorageError};
pub use tier::{MemoryTier, SessionLookup, SessionTier};
