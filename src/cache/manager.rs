// Response cache - fingerprinting and two-tier lookup
// Author: kelexine (https://github.com/kelexine)

use crate::cache::models::CacheStats;
use crate::cache::store::KeyValueStore;
use crate::models::{CacheEntry, CaptionOutcome, GenerationOptions};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Key prefix for durable entries; one entry per image id.
pub const DURABLE_KEY_PREFIX: &str = "captionmaption_image_analysis";

/// Two-tier cache in front of the paid API.
///
/// - The volatile tier lives for the lifetime of this value and is keyed by
///   the fingerprint of (image id, options).
/// - The durable tier is keyed by image id alone and holds the last
///   successful analysis for that image, whatever options produced it.
///
/// Durable-tier failures never surface: reads degrade to a miss and writes to
/// a no-op.
pub struct ResponseCache {
    volatile: Mutex<HashMap<String, CaptionOutcome>>,
    durable: Arc<dyn KeyValueStore>,
    stats: Mutex<CacheStats>,
}

impl ResponseCache {
    pub fn new(durable: Arc<dyn KeyValueStore>) -> Self {
        Self {
            volatile: Mutex::new(HashMap::new()),
            durable,
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Deterministic SHA256 fingerprint of an image id and its options
    pub fn fingerprint(image_id: &str, options: &GenerationOptions) -> String {
        let mut hasher = Sha256::new();

        hasher.update(image_id.as_bytes());
        hasher.update(b"\0");
        // Struct fields serialize in declaration order, so this is stable
        hasher.update(serde_json::to_string(options).unwrap_or_default().as_bytes());

        format!("{:x}", hasher.finalize())
    }

    fn durable_key(image_id: &str) -> String {
        format!("{}:{}", DURABLE_KEY_PREFIX, image_id)
    }

    /// Volatile-tier lookup.
    pub fn get_by_fingerprint(
        &self,
        image_id: &str,
        options: &GenerationOptions,
    ) -> Option<CaptionOutcome> {
        let key = Self::fingerprint(image_id, options);
        let found = self.volatile.lock().get(&key).cloned();

        let mut stats = self.stats.lock();
        if found.is_some() {
            debug!("Cache hit for image {} (fingerprint {})", image_id, &key[..16]);
            stats.hits += 1;
            crate::metrics::record_cache_operation("volatile", "hit");
        } else {
            stats.misses += 1;
            crate::metrics::record_cache_operation("volatile", "miss");
        }
        found
    }

    /// Durable-tier lookup, insensitive to options.
    pub fn get_by_image(&self, image_id: &str) -> Option<CacheEntry> {
        let raw = match self.durable.get(&Self::durable_key(image_id)) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Error reading from cache for image {}: {}", image_id, e);
                self.record_durable_error();
                None
            }
        };

        let entry = raw.and_then(|raw| match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Discarding unreadable cache entry for image {}: {}", image_id, e);
                self.record_durable_error();
                None
            }
        });

        let mut stats = self.stats.lock();
        if entry.is_some() {
            debug!("Durable cache hit for image {}", image_id);
            stats.durable_hits += 1;
            crate::metrics::record_cache_operation("durable", "hit");
        } else {
            stats.durable_misses += 1;
            crate::metrics::record_cache_operation("durable", "miss");
        }
        entry
    }

    /// Write both tiers. The durable entry for `image_id` is replaced wholesale.
    pub fn put(&self, image_id: &str, options: &GenerationOptions, outcome: &CaptionOutcome) {
        let key = Self::fingerprint(image_id, options);
        self.volatile.lock().insert(key, outcome.clone());
        crate::metrics::record_cache_operation("volatile", "write");

        let entry = CacheEntry::from(outcome.clone());
        let persisted = serde_json::to_string(&entry)
            .map_err(crate::error::CaptionError::from)
            .and_then(|json| self.durable.set(&Self::durable_key(image_id), &json));

        match persisted {
            Ok(()) => crate::metrics::record_cache_operation("durable", "write"),
            Err(e) => {
                warn!("Error saving to cache for image {}: {}", image_id, e);
                self.record_durable_error();
            }
        }

        self.stats.lock().writes += 1;
        debug!("Cached outcome for image {}", image_id);
    }

    /// Empty the volatile tier. The durable tier is untouched.
    pub fn clear_volatile(&self) {
        self.volatile.lock().clear();
        debug!("Volatile cache cleared");
    }

    /// Number of entries in the volatile tier
    pub fn volatile_len(&self) -> usize {
        self.volatile.lock().len()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    fn record_durable_error(&self) {
        self.stats.lock().durable_errors += 1;
        crate::metrics::record_cache_operation("durable", "error");
    }
}
