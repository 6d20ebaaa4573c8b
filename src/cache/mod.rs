// Response cache module
// Author: kelexine (https://github.com/kelexine)

pub mod manager;
pub mod models;
pub mod store;

pub use manager::ResponseCache;
pub use models::CacheStats;
pub use store::{FileStore, KeyValueStore, MemoryStore};
