//! Semantic result cache with per-entry TTL.
//!
//! Keyed by business parameters (vendor name, product URL, ...) rather than
//! raw prompt text, so equivalent requests phrased with different wording
//! still hit. Distinct from the gateway's raw-call cache.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Vendor/product detail lookups change rarely.
pub const DETAILS_TTL_SECONDS: i64 = 7 * 24 * 3600;
/// Matches are cheap to recompute and the classification logic is iterated
/// on more often.
pub const MATCH_TTL_SECONDS: i64 = 24 * 3600;

struct CacheEntry {
    value: Value,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Process-wide hit/miss counters; observability only, no correctness
/// dependency.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Default)]
pub struct ResultCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic key over a kind tag plus canonicalized (stable key
    /// ordering) business parameters.
    fn key(kind: &str, params: &[(&str, &str)]) -> String {
        let sorted: BTreeMap<&str, &str> = params.iter().copied().collect();
        let canonical = serde_json::to_string(&sorted).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update(b"\0");
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Returns the cached value, or `None` when absent or expired. An
    /// expired entry is lazily evicted here; there is no background sweep.
    pub async fn get(&self, kind: &str, params: &[(&str, &str)]) -> Option<Value> {
        let key = Self::key(kind, params);
        let expired = {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(entry) if entry.expires_at > Utc::now() => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(kind, key = %&key[..16], "semantic cache hit");
                    return Some(entry.value.clone());
                }
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            self.entries.write().await.remove(&key);
            debug!(kind, key = %&key[..16], "semantic cache entry expired");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a value under the canonicalized parameters. Re-setting the same
    /// key overwrites the entry wholesale; concurrent writers race harmlessly
    /// (last write wins).
    pub async fn set(&self, kind: &str, params: &[(&str, &str)], value: Value, ttl_seconds: i64) {
        let key = Self::key(kind, params);
        let now = Utc::now();
        let entry = CacheEntry {
            value,
            created_at: now,
            expires_at: now + Duration::seconds(ttl_seconds),
        };
        self.entries.write().await.insert(key, entry);
        debug!(kind, ttl_seconds, "semantic cache store");
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.read().await.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}
