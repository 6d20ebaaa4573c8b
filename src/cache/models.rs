//! Cache statistics models.

// Author: kelexine (https://github.com/kelexine)

use serde::Serialize;

/// Statistics for response cache operations.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Volatile-tier lookups that returned an outcome.
    pub hits: u64,
    /// Volatile-tier lookups that found nothing.
    pub misses: u64,
    /// Durable-tier lookups that returned an entry.
    pub durable_hits: u64,
    /// Durable-tier lookups that found nothing (including absorbed read errors).
    pub durable_misses: u64,
    /// Successful `put` calls.
    pub writes: u64,
    /// Durable-tier read or write failures that were absorbed.
    pub durable_errors: u64,
}
