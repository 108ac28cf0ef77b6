use crate::app::ports::{ListingQuery, PageFetcher};
use crate::catalog::{FederationSource, SourceCatalog};
use crate::constants::{DEFAULT_WINDOW_DAYS, LISTING_DATE_FORMAT};
use crate::geo::GeoResolver;
use crate::observability::{geocoding as geo_metrics, parser as parser_metrics, sources as source_metrics};
use crate::types::Tournament;
use chrono::{Duration, Local, NaiveDate};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn, Instrument};

/// Parameters of one ingestion pass; unset dates default to a two-week window from today
#[derive(Debug, Clone, Default)]
pub struct IngestionRequest {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub comp_type: Option<String>,
    /// Source ids to include; `None` or empty means every source
    pub federations: Option<Vec<String>>,
}

impl IngestionRequest {
    pub fn listing_query(&self, today: NaiveDate) -> ListingQuery {
        let non_empty = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();
        ListingQuery {
            date_from: non_empty(&self.date_from)
                .unwrap_or_else(|| today.format(LISTING_DATE_FORMAT).to_string()),
            date_to: non_empty(&self.date_to).unwrap_or_else(|| {
                (today + Duration::days(DEFAULT_WINDOW_DAYS))
                    .format(LISTING_DATE_FORMAT)
                    .to_string()
            }),
            comp_type: non_empty(&self.comp_type),
        }
    }
}

/// Runs one task per selected source: fetch, extract, then geocode each
/// tournament in document order
pub struct IngestionOrchestrator {
    catalog: SourceCatalog,
    fetcher: Arc<dyn PageFetcher>,
    resolver: Arc<GeoResolver>,
}

impl IngestionOrchestrator {
    pub fn new(
        catalog: SourceCatalog,
        fetcher: Arc<dyn PageFetcher>,
        resolver: Arc<GeoResolver>,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            resolver,
        }
    }

    /// Aggregated tournaments of every selected source. A failing source
    /// contributes nothing; the pass itself never fails.
    #[instrument(skip(self))]
    pub async fn fetch_and_geocode(&self, request: &IngestionRequest) -> Vec<Tournament> {
        let query = request.listing_query(Local::now().date_naive());
        let sources = self.catalog.select(request.federations.as_deref());
        info!(
            "Get Tournaments from: {} to: {}, compType: {}, sources: {}",
            query.date_from,
            query.date_to,
            query.comp_type.as_deref().unwrap_or(""),
            sources.len()
        );

        let collected: Arc<Mutex<Vec<Tournament>>> = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = JoinSet::new();

        for source in sources {
            let fetcher = self.fetcher.clone();
            let resolver = self.resolver.clone();
            let query = query.clone();
            let collected = collected.clone();
            let span = tracing::info_span!("source", id = %source.id);

            tasks.spawn(
                async move {
                    let tournaments = process_source(&source, &query, fetcher, resolver).await;
                    if !tournaments.is_empty() {
                        collected.lock().await.extend(tournaments);
                    }
                }
                .instrument(span),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Source task aborted: {}", e);
            }
        }

        let mut collected = collected.lock().await;
        info!("Ingestion pass finished with {} tournaments", collected.len());
        std::mem::take(&mut *collected)
    }

    /// Same pass as `fetch_and_geocode`, run only to fill the geocoding cache
    pub async fn warmup(&self, request: &IngestionRequest) -> usize {
        info!(
            "Warmup: from {:?} to {:?}, compType: {:?}, federations: {:?}",
            request.date_from, request.date_to, request.comp_type, request.federations
        );
        let total = self.fetch_and_geocode(request).await.len();
        info!("Warmup finished. Tournaments fetched: {}", total);
        total
    }
}

async fn process_source(
    source: &FederationSource,
    query: &ListingQuery,
    fetcher: Arc<dyn PageFetcher>,
    resolver: Arc<GeoResolver>,
) -> Vec<Tournament> {
    let started = Instant::now();
    let body = match fetcher.fetch(source, query).await {
        Ok(body) => {
            source_metrics::request_success(&source.id);
            body
        }
        Err(e) => {
            error!("Failed to fetch listing for {}: {}", source.id, e);
            source_metrics::request_error(&source.id);
            return Vec::new();
        }
    };
    source_metrics::request_duration(&source.id, started.elapsed().as_secs_f64());

    let mut tournaments = source.dialect.extractor().extract_from_str(&body);
    debug!(
        dialect = source.dialect.name(),
        count = tournaments.len(),
        "Extracted listing rows"
    );
    parser_metrics::tournaments_extracted(&source.id, tournaments.len());

    for tournament in tournaments.iter_mut() {
        match resolver.resolve(&source.region, tournament).await {
            Some(coordinates) => tournament.set_coordinates(&coordinates),
            None => {
                warn!(
                    "No Geocoordinates could be found for ({}): '{}'. Falling back to default in '{}'",
                    tournament.id, tournament.location, source.region
                );
                geo_metrics::default_coordinates(&source.id);
                tournament.set_coordinates(&source.default_coordinates);
            }
        }
    }

    info!("Federation {}: Found {} tournaments total", source.id, tournaments.len());
    tournaments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_two_weeks_from_today() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 12).unwrap();
        let query = IngestionRequest::default().listing_query(today);
        assert_eq!(query.date_from, "12.05.2026");
        assert_eq!(query.date_to, "26.05.2026");
        assert_eq!(query.comp_type, None);
    }

    #[test]
    fn explicit_values_are_kept_and_blank_ones_defaulted() {
        let today = NaiveDate::from_ymd_opt(2026, 12, 25).unwrap();
        let request = IngestionRequest {
            date_from: Some("01.01.2027".into()),
            date_to: Some("  ".into()),
            comp_type: Some("Damen+Einzel".into()),
            federations: None,
        };
        let query = request.listing_query(today);
        assert_eq!(query.date_from, "01.01.2027");
        assert_eq!(query.date_to, "08.01.2027");
        assert_eq!(query.comp_type.as_deref(), Some("Damen+Einzel"));
    }
}
