use super::backoff;
use super::place_name::place_from_organizer;
use crate::app::ports::Geocoder;
use crate::constants::GEOCODER_RESULT_LIMIT;
use crate::observability::{cache as cache_metrics, geocoding as geo_metrics};
use crate::storage::{CacheKey, CacheStore, CacheTier};
use crate::types::{Coordinates, GeoRecord, Tournament};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Outcome of the cache walk for one tournament
enum Lookup {
    Hit(Coordinates),
    /// Failed recently; do not query again yet
    Suppressed,
    Miss { previous_failures: u32 },
}

/// Resolves tournaments to coordinates through the location, organizer and
/// tournament-id cache tiers before asking the external geocoder
pub struct GeoResolver {
    store: Arc<CacheStore>,
    geocoder: Arc<dyn Geocoder>,
}

impl GeoResolver {
    pub fn new(store: Arc<CacheStore>, geocoder: Arc<dyn Geocoder>) -> Self {
        Self { store, geocoder }
    }

    pub async fn resolve(&self, region: &str, tournament: &Tournament) -> Option<Coordinates> {
        self.resolve_at(region, tournament, chrono::Utc::now().timestamp())
            .await
    }

    /// `None` means the caller should fall back to its default coordinates
    pub async fn resolve_at(
        &self,
        region: &str,
        tournament: &Tournament,
        now: i64,
    ) -> Option<Coordinates> {
        let previous_failures = match self.lookup(region, tournament, now) {
            Lookup::Hit(coordinates) => return Some(coordinates),
            Lookup::Suppressed => {
                debug!(tournament_id = %tournament.id, "Skipping geocoding until retry is due");
                return None;
            }
            Lookup::Miss { previous_failures } => previous_failures,
        };

        let query = if !tournament.location.is_empty() {
            tournament.location.clone()
        } else if !tournament.organizer.is_empty() {
            place_from_organizer(&tournament.organizer)
        } else {
            warn!(tournament_id = %tournament.id, "No location or organizer to geocode");
            self.record_failure(&tournament.id, previous_failures, now);
            return None;
        };

        debug!(
            tournament_id = %tournament.id,
            query = %query,
            "No geocoding cache entry, querying geocoder"
        );
        geo_metrics::query();
        let candidates = match self.geocoder.search(&query, GEOCODER_RESULT_LIMIT).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(tournament_id = %tournament.id, "Geocoding request failed: {}", e);
                geo_metrics::query_error();
                self.record_failure(&tournament.id, previous_failures, now);
                return None;
            }
        };

        match candidates
            .into_iter()
            .find(|c| c.display_name.contains(region) && !c.is_empty())
        {
            Some(coordinates) => {
                self.record_success(region, tournament, &coordinates);
                Some(coordinates)
            }
            None => {
                warn!(
                    tournament_id = %tournament.id,
                    region = %region,
                    query = %query,
                    "No suitable geocoordinates found"
                );
                geo_metrics::unresolved();
                self.record_failure(&tournament.id, previous_failures, now);
                None
            }
        }
    }

    fn lookup(&self, region: &str, tournament: &Tournament, now: i64) -> Lookup {
        if !tournament.location.is_empty() {
            let key = CacheKey::location(&tournament.location, region);
            if let Some(GeoRecord::Resolved(c)) = self.read(&key) {
                geo_metrics::cache_hit(CacheTier::Location.name());
                return Lookup::Hit(c);
            }
        }
        if !tournament.organizer.is_empty() {
            let key = CacheKey::organizer(&tournament.organizer, region);
            if let Some(GeoRecord::Resolved(c)) = self.read(&key) {
                geo_metrics::cache_hit(CacheTier::Organizer.name());
                return Lookup::Hit(c);
            }
        }
        match self.read(&CacheKey::tournament(&tournament.id)) {
            Some(GeoRecord::Resolved(c)) => {
                geo_metrics::cache_hit(CacheTier::Tournament.name());
                Lookup::Hit(c)
            }
            Some(GeoRecord::Failed(meta)) if !backoff::is_retry_due(&meta, now) => {
                Lookup::Suppressed
            }
            Some(GeoRecord::Failed(meta)) => Lookup::Miss {
                previous_failures: meta.fail_count,
            },
            None => Lookup::Miss {
                previous_failures: 0,
            },
        }
    }

    /// Cache errors degrade to a miss
    fn read(&self, key: &CacheKey) -> Option<GeoRecord> {
        match self.store.get(key) {
            Ok(record) => record,
            Err(e) => {
                error!("Failed to read geocoding cache key {}: {}", key, e);
                cache_metrics::error();
                None
            }
        }
    }

    fn write(&self, key: &CacheKey, record: &GeoRecord) {
        if let Err(e) = self.store.set(key, record) {
            error!("Failed to persist geocoding cache key {}: {}", key, e);
            cache_metrics::error();
        }
    }

    /// Success is visible under every key the tournament can be looked up by
    fn record_success(&self, region: &str, tournament: &Tournament, coordinates: &Coordinates) {
        let record = GeoRecord::Resolved(coordinates.clone());
        self.write(&CacheKey::tournament(&tournament.id), &record);
        if !tournament.location.is_empty() {
            self.write(&CacheKey::location(&tournament.location, region), &record);
        }
        if !tournament.organizer.is_empty() {
            self.write(&CacheKey::organizer(&tournament.organizer, region), &record);
        }
    }

    /// Failures are only tracked per tournament
    fn record_failure(&self, tournament_id: &str, previous_failures: u32, now: i64) {
        self.write(
            &CacheKey::tournament(tournament_id),
            &GeoRecord::failed(now, previous_failures.saturating_add(1)),
        );
    }
}
