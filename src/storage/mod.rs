//! Geocoding cache: string-keyed `GeoRecord`s in a durable backend, optionally
//! mirrored in memory for reads.

pub mod sqlite;

pub use sqlite::SqliteBackend;

use crate::error::{Result, ScraperError};
use crate::geo::backoff;
use crate::types::GeoRecord;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use tracing::{error, info, warn};

/// Raw string storage the cache is persisted in
pub trait KeyValueBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Must be durable when it returns
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<bool>;
    fn scan(&self) -> Result<Vec<(String, String)>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Tournament,
    Location,
    Organizer,
}

impl CacheTier {
    fn prefix(&self) -> &'static str {
        match self {
            CacheTier::Tournament => "tid:",
            CacheTier::Location => "loc:",
            CacheTier::Organizer => "org:",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CacheTier::Tournament => "tournament",
            CacheTier::Location => "location",
            CacheTier::Organizer => "organizer",
        }
    }

    pub fn of_key(key: &str) -> Option<Self> {
        [CacheTier::Tournament, CacheTier::Location, CacheTier::Organizer]
            .into_iter()
            .find(|tier| key.starts_with(tier.prefix()))
    }
}

/// Namespaced cache key; the three tiers can never collide
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn tournament(id: &str) -> Self {
        CacheKey(format!("{}{}", CacheTier::Tournament.prefix(), id))
    }

    /// Location keys are case and padding insensitive and scoped to a region
    pub fn location(location: &str, region: &str) -> Self {
        CacheKey(format!(
            "{}{}|{}",
            CacheTier::Location.prefix(),
            location.trim().to_lowercase(),
            region
        ))
    }

    pub fn organizer(organizer: &str, region: &str) -> Self {
        CacheKey(format!(
            "{}{}|{}",
            CacheTier::Organizer.prefix(),
            organizer.trim().to_lowercase(),
            region
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn tier(&self) -> Option<CacheTier> {
        CacheTier::of_key(&self.0)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatistics {
    pub total_entries: usize,
    pub successful: usize,
    pub failed: usize,
    pub pending_retry: usize,
    pub permanently_failed: usize,
    pub tournament_cache_size: usize,
    pub location_cache_size: usize,
    pub organizer_cache_size: usize,
}

pub struct CacheStore {
    backend: Box<dyn KeyValueBackend>,
    /// Read mirror of the whole backend; `None` reads go straight to the backend
    mirror: Option<RwLock<HashMap<String, GeoRecord>>>,
}

impl CacheStore {
    /// Open the durable cache at `path` (`:memory:` for a throwaway store)
    pub fn open<P: AsRef<Path>>(path: P, mirror: bool) -> Result<Self> {
        let backend = SqliteBackend::open(path)?;
        Self::new(Box::new(backend), mirror)
    }

    /// Like `open`, but degrades to a memory-only store when the durable file
    /// cannot be opened
    pub fn open_or_memory<P: AsRef<Path>>(path: P, mirror: bool) -> Result<Self> {
        match Self::open(path.as_ref(), mirror) {
            Ok(store) => Ok(store),
            Err(e) => {
                error!(
                    "Failed to open geocoding cache at {}: {}. Falling back to memory-only cache",
                    path.as_ref().display(),
                    e
                );
                Self::in_memory()
            }
        }
    }

    pub fn in_memory() -> Result<Self> {
        Self::new(Box::new(SqliteBackend::in_memory()?), true)
    }

    pub fn new(backend: Box<dyn KeyValueBackend>, mirror: bool) -> Result<Self> {
        let mirror = if mirror {
            let loaded: HashMap<String, GeoRecord> = decode_entries(backend.scan()?).collect();
            info!("Loaded {} geocoding cache entries into memory", loaded.len());
            Some(RwLock::new(loaded))
        } else {
            None
        };
        Ok(Self { backend, mirror })
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirror.is_some()
    }

    pub fn get(&self, key: &CacheKey) -> Result<Option<GeoRecord>> {
        if let Some(mirror) = &self.mirror {
            let map = mirror.read().unwrap_or_else(PoisonError::into_inner);
            return Ok(map.get(key.as_str()).cloned());
        }
        match self.backend.get(key.as_str())? {
            Some(raw) => Ok(Some(decode(key.as_str(), &raw)?)),
            None => Ok(None),
        }
    }

    /// Persist first, then update the mirror. The mirror's write guard is held
    /// across both so concurrent writers land in the same order on disk and in memory.
    pub fn set(&self, key: &CacheKey, record: &GeoRecord) -> Result<()> {
        let raw = serde_json::to_string(record)?;
        match &self.mirror {
            Some(mirror) => {
                let mut map = mirror.write().unwrap_or_else(PoisonError::into_inner);
                self.backend.put(key.as_str(), &raw)?;
                map.insert(key.as_str().to_string(), record.clone());
            }
            None => self.backend.put(key.as_str(), &raw)?,
        }
        Ok(())
    }

    pub fn delete(&self, key: &CacheKey) -> Result<bool> {
        match &self.mirror {
            Some(mirror) => {
                let mut map = mirror.write().unwrap_or_else(PoisonError::into_inner);
                let removed = self.backend.delete(key.as_str())?;
                map.remove(key.as_str());
                Ok(removed)
            }
            None => self.backend.delete(key.as_str()),
        }
    }

    /// Snapshot of every decodable entry
    pub fn entries(&self) -> Result<Vec<(String, GeoRecord)>> {
        if let Some(mirror) = &self.mirror {
            let map = mirror.read().unwrap_or_else(PoisonError::into_inner);
            let mut entries: Vec<_> = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            return Ok(entries);
        }
        Ok(decode_entries(self.backend.scan()?).collect())
    }

    /// Aggregate counters cover the tournament tier only, one entry per known
    /// tournament; the other tiers are reported by size
    pub fn statistics(&self, now: i64) -> Result<CacheStatistics> {
        let mut stats = CacheStatistics::default();
        for (key, record) in self.entries()? {
            match CacheTier::of_key(&key) {
                Some(CacheTier::Location) => {
                    stats.location_cache_size += 1;
                    continue;
                }
                Some(CacheTier::Organizer) => {
                    stats.organizer_cache_size += 1;
                    continue;
                }
                _ => stats.tournament_cache_size += 1,
            }
            stats.total_entries += 1;
            match record {
                GeoRecord::Resolved(_) => stats.successful += 1,
                GeoRecord::Failed(meta) => {
                    stats.failed += 1;
                    if backoff::is_retry_due(&meta, now) {
                        stats.pending_retry += 1;
                    } else if meta.fail_count >= backoff::PERMANENT_FAIL_COUNT {
                        stats.permanently_failed += 1;
                    }
                }
            }
        }
        Ok(stats)
    }

    pub fn cleanup_old_failed_entries(&self) -> Result<usize> {
        self.cleanup_failed_before(chrono::Utc::now().timestamp())
    }

    /// Evict permanently failed tournament records that have not been retried
    /// for a month; returns the number removed
    pub fn cleanup_failed_before(&self, now: i64) -> Result<usize> {
        let mut removed = 0;
        for (key, record) in self.entries()? {
            let evictable = record
                .failure()
                .map(|meta| backoff::is_evictable(meta, now))
                .unwrap_or(false);
            if !evictable {
                continue;
            }
            match self.delete(&CacheKey(key.clone())) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => error!("Failed to delete cache key {} during cleanup: {}", key, e),
            }
        }
        info!("Cleaned up {} old failed geocoding entries", removed);
        Ok(removed)
    }
}

fn decode(key: &str, raw: &str) -> Result<GeoRecord> {
    serde_json::from_str(raw).map_err(|e| ScraperError::Cache {
        message: format!("corrupt cache entry {}: {}", key, e),
    })
}

/// Decodes scanned rows, skipping corrupt ones
fn decode_entries(rows: Vec<(String, String)>) -> impl Iterator<Item = (String, GeoRecord)> {
    rows.into_iter().filter_map(|(key, raw)| match decode(&key, &raw) {
        Ok(record) => Some((key, record)),
        Err(e) => {
            warn!("Skipping cache entry: {}", e);
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coordinates;

    const DAY: i64 = 24 * 3600;
    const NOW: i64 = 1_760_000_000;

    fn resolved() -> GeoRecord {
        GeoRecord::Resolved(Coordinates {
            lat: "49.41".into(),
            lon: "8.69".into(),
            display_name: "Heidelberg, Baden-Württemberg, Deutschland".into(),
        })
    }

    #[test]
    fn keys_are_namespaced_and_normalized() {
        assert_eq!(CacheKey::tournament("42").as_str(), "tid:42");
        assert_eq!(
            CacheKey::location("  Tennisanlage Am Neckar ", "Hessen").as_str(),
            "loc:tennisanlage am neckar|Hessen"
        );
        assert_ne!(
            CacheKey::location("x", "Hessen"),
            CacheKey::organizer("x", "Hessen")
        );
        assert_eq!(
            CacheKey::organizer("TC X", "Sachsen").tier(),
            Some(CacheTier::Organizer)
        );
    }

    #[test]
    fn mirrored_and_direct_modes_agree() {
        for mirror in [true, false] {
            let store = CacheStore::new(Box::new(SqliteBackend::in_memory().unwrap()), mirror).unwrap();
            let key = CacheKey::tournament("7");
            assert_eq!(store.get(&key).unwrap(), None);
            store.set(&key, &resolved()).unwrap();
            assert_eq!(store.get(&key).unwrap(), Some(resolved()));
            assert!(store.delete(&key).unwrap());
            assert_eq!(store.get(&key).unwrap(), None);
        }
    }

    #[test]
    fn statistics_classify_failures() {
        let store = CacheStore::in_memory().unwrap();
        store.set(&CacheKey::tournament("ok"), &resolved()).unwrap();
        store.set(&CacheKey::location("a", "Hessen"), &resolved()).unwrap();
        store
            .set(&CacheKey::tournament("due"), &GeoRecord::failed(NOW - 2 * DAY, 1))
            .unwrap();
        store
            .set(&CacheKey::tournament("perm"), &GeoRecord::failed(NOW - DAY, 5))
            .unwrap();
        store
            .set(&CacheKey::tournament("young"), &GeoRecord::failed(NOW - DAY, 2))
            .unwrap();

        let stats = store.statistics(NOW).unwrap();
        // the location entry is reported by size only
        assert_eq!(stats.total_entries, 4);
        assert_eq!(stats.successful, 1);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.pending_retry, 1);
        assert_eq!(stats.permanently_failed, 1);
        assert_eq!(stats.tournament_cache_size, 4);
        assert_eq!(stats.location_cache_size, 1);
    }

    #[test]
    fn cleanup_removes_only_old_permanent_failures() {
        let store = CacheStore::in_memory().unwrap();
        store
            .set(&CacheKey::tournament("old"), &GeoRecord::failed(NOW - 40 * DAY, 4))
            .unwrap();
        store
            .set(&CacheKey::tournament("recent"), &GeoRecord::failed(NOW - 10 * DAY, 4))
            .unwrap();
        store
            .set(&CacheKey::tournament("few"), &GeoRecord::failed(NOW - 40 * DAY, 2))
            .unwrap();
        store.set(&CacheKey::tournament("ok"), &resolved()).unwrap();

        assert_eq!(store.cleanup_failed_before(NOW).unwrap(), 1);
        assert_eq!(store.get(&CacheKey::tournament("old")).unwrap(), None);
        assert_eq!(store.entries().unwrap().len(), 3);
    }

    #[test]
    fn corrupt_entries_are_skipped_on_load() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.put("tid:bad", "not json").unwrap();
        backend
            .put("tid:good", &serde_json::to_string(&resolved()).unwrap())
            .unwrap();

        let store = CacheStore::new(Box::new(backend), true).unwrap();
        assert_eq!(store.entries().unwrap().len(), 1);
    }
}
