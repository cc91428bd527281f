//! Caching layer for point-to-point road distances.
//!
//! Driving-distance lookups are the expensive part of planning. Results are
//! keyed by a deterministic string built from the segment endpoints, so the
//! same leg shared by different candidate routes hits the same entry.
//!
//! Each entry carries its own timeout. An entry is stale once
//! `now > updated_at + timeout`; stale entries are treated as absent and
//! evicted lazily when read.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use moka::Expiry;
use moka::future::Cache as MokaCache;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::SegmentMetrics;

/// Timeout applied by [`DistanceCache::set_default`] (one hour).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Errors from persisting or restoring a cache snapshot.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Reading or writing the snapshot file failed
    #[error("cache I/O error: {message}")]
    Io { message: String },

    /// Snapshot contents could not be (de)serialized
    #[error("cache snapshot format error: {message}")]
    Json { message: String },
}

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Key-value store for road distance lookups.
///
/// The cache is advisory: callers must tolerate a miss by recomputing.
pub trait DistanceCache {
    /// Get a live entry. Expired entries read as `None`.
    fn get(&self, key: &str) -> impl Future<Output = Option<SegmentMetrics>> + Send;

    /// Insert or replace an entry. Replacing resets its age and timeout.
    fn set(
        &self,
        key: &str,
        value: SegmentMetrics,
        timeout: Duration,
    ) -> impl Future<Output = ()> + Send;

    /// Insert with [`DEFAULT_TIMEOUT`].
    fn set_default(&self, key: &str, value: SegmentMetrics) -> impl Future<Output = ()> + Send {
        self.set(key, value, DEFAULT_TIMEOUT)
    }
}

/// A stored cache entry with its timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceCacheEntry {
    pub value: SegmentMetrics,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Lifetime after `updated_at`, in milliseconds.
    pub timeout_ms: u64,
}

impl DistanceCacheEntry {
    fn expires_at(&self) -> Option<DateTime<Utc>> {
        let ms = i64::try_from(self.timeout_ms).ok()?;
        self.updated_at
            .checked_add_signed(chrono::Duration::try_milliseconds(ms)?)
    }

    /// Whether the entry is stale at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| now > at)
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    saved_at: DateTime<Utc>,
    entries: HashMap<String, DistanceCacheEntry>,
}

/// Unbounded in-process cache with exact per-entry expiry.
///
/// The clock is injected so expiry can be driven deterministically. The
/// contents can be persisted to a JSON snapshot and restored later.
pub struct MemoryDistanceCache<C: Clock = SystemClock> {
    entries: RwLock<HashMap<String, DistanceCacheEntry>>,
    clock: C,
}

impl MemoryDistanceCache<SystemClock> {
    /// Create an empty cache using wall-clock time.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryDistanceCache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryDistanceCache<C> {
    /// Create an empty cache driven by `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of stored entries, including any not yet evicted.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Raw entry lookup, ignoring expiry.
    pub async fn entry(&self, key: &str) -> Option<DistanceCacheEntry> {
        self.entries.read().await.get(key).cloned()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Write all live entries to a JSON file.
    ///
    /// Creates parent directories if they don't exist.
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<(), CacheError> {
        let path = path.as_ref();
        let now = self.clock.now();
        let entries: HashMap<String, DistanceCacheEntry> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let snapshot = Snapshot {
            saved_at: now,
            entries,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Io {
                message: format!("failed to create snapshot directory: {e}"),
            })?;
        }

        let json = serde_json::to_string_pretty(&snapshot).map_err(|e| CacheError::Json {
            message: e.to_string(),
        })?;

        std::fs::write(path, json).map_err(|e| CacheError::Io {
            message: format!("failed to write {}: {e}", path.display()),
        })
    }

    /// Restore a cache from a snapshot written by [`save_snapshot`].
    ///
    /// Entries that have expired since the snapshot was taken are skipped.
    ///
    /// [`save_snapshot`]: MemoryDistanceCache::save_snapshot
    pub fn load_snapshot(path: impl AsRef<Path>, clock: C) -> Result<Self, CacheError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| CacheError::Io {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        let snapshot: Snapshot = serde_json::from_str(&contents).map_err(|e| CacheError::Json {
            message: e.to_string(),
        })?;

        let now = clock.now();
        let entries = snapshot
            .entries
            .into_iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .collect();

        Ok(Self {
            entries: RwLock::new(entries),
            clock,
        })
    }
}

impl<C: Clock> DistanceCache for MemoryDistanceCache<C> {
    async fn get(&self, key: &str) -> Option<SegmentMetrics> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.value),
                Some(_) => {}
            }
        }

        // Expired: evict. Re-check under the write lock in case a writer
        // refreshed the entry in between.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        None
    }

    async fn set(&self, key: &str, value: SegmentMetrics, timeout: Duration) {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let created_at = entries.get(key).map(|e| e.created_at).unwrap_or(now);
        entries.insert(
            key.to_string(),
            DistanceCacheEntry {
                value,
                created_at,
                updated_at: now,
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
        );
    }
}

/// Configuration for the bounded cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached segments.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
struct TimedMetrics {
    value: SegmentMetrics,
    timeout: Duration,
}

/// Gives every moka entry the timeout it was inserted with.
struct PerEntryTimeout;

impl Expiry<String, TimedMetrics> for PerEntryTimeout {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &TimedMetrics,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.timeout)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &TimedMetrics,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.timeout)
    }
}

/// Size-bounded cache for long-running processes.
///
/// Backed by moka: least-recently-used entries are evicted once
/// `max_capacity` is reached, and each entry expires after its own timeout.
#[derive(Clone)]
pub struct BoundedDistanceCache {
    inner: MokaCache<String, TimedMetrics>,
}

impl BoundedDistanceCache {
    pub fn new(config: &CacheConfig) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTimeout)
            .build();
        Self { inner }
    }

    /// Approximate number of live entries (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

impl DistanceCache for BoundedDistanceCache {
    async fn get(&self, key: &str) -> Option<SegmentMetrics> {
        self.inner.get(key).await.map(|t| t.value)
    }

    async fn set(&self, key: &str, value: SegmentMetrics, timeout: Duration) {
        self.inner
            .insert(key.to_string(), TimedMetrics { value, timeout })
            .await;
    }
}
