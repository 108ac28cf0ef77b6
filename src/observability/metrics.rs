//! Prometheus counters for ingestion and geocoding.
//!
//! Recording is a no-op until `init` installs the exporter, so library code
//! and tests can call the recorders unconditionally.

use std::fmt;
use std::net::SocketAddr;
use tracing::info;

/// All metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Sources
    SourcesRequestsSuccess,
    SourcesRequestsError,
    SourcesRequestDuration,

    // Parser
    ParserTournamentsExtracted,

    // Geocoding
    GeocodingCacheHits,
    GeocodingQueries,
    GeocodingQueryErrors,
    GeocodingUnresolved,
    GeocodingDefaultCoordinates,

    // Cache
    CacheErrors,
    CacheCleanupRemoved,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::SourcesRequestsSuccess => "ttf_sources_requests_success_total",
            MetricName::SourcesRequestsError => "ttf_sources_requests_error_total",
            MetricName::SourcesRequestDuration => "ttf_sources_request_duration_seconds",
            MetricName::ParserTournamentsExtracted => "ttf_parser_tournaments_extracted_total",
            MetricName::GeocodingCacheHits => "ttf_geocoding_cache_hits_total",
            MetricName::GeocodingQueries => "ttf_geocoding_queries_total",
            MetricName::GeocodingQueryErrors => "ttf_geocoding_query_errors_total",
            MetricName::GeocodingUnresolved => "ttf_geocoding_unresolved_total",
            MetricName::GeocodingDefaultCoordinates => "ttf_geocoding_default_coordinates_total",
            MetricName::CacheErrors => "ttf_cache_errors_total",
            MetricName::CacheCleanupRemoved => "ttf_cache_cleanup_removed_total",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            SourcesRequestsSuccess,
            SourcesRequestsError,
            SourcesRequestDuration,
            ParserTournamentsExtracted,
            GeocodingCacheHits,
            GeocodingQueries,
            GeocodingQueryErrors,
            GeocodingUnresolved,
            GeocodingDefaultCoordinates,
            CacheErrors,
            CacheCleanupRemoved,
        ]
        .into_iter()
    }

    /// (phase, description)
    pub fn metadata(&self) -> (&'static str, &'static str) {
        match self {
            MetricName::SourcesRequestsSuccess => ("sources", "Successful listing fetches"),
            MetricName::SourcesRequestsError => ("sources", "Failed listing fetches"),
            MetricName::SourcesRequestDuration => ("sources", "Listing fetch duration in seconds"),
            MetricName::ParserTournamentsExtracted => ("parser", "Tournaments extracted from listings"),
            MetricName::GeocodingCacheHits => ("geocoding", "Cache hits by tier"),
            MetricName::GeocodingQueries => ("geocoding", "External geocoding queries"),
            MetricName::GeocodingQueryErrors => ("geocoding", "Failed external geocoding queries"),
            MetricName::GeocodingUnresolved => ("geocoding", "Queries without an in-region candidate"),
            MetricName::GeocodingDefaultCoordinates => ("geocoding", "Tournaments given federation default coordinates"),
            MetricName::CacheErrors => ("cache", "Cache read or write errors"),
            MetricName::CacheCleanupRemoved => ("cache", "Entries removed by cleanup"),
        }
    }
}

/// Install the Prometheus recorder and serve `/metrics` on `addr`
pub fn init(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))?;

    for metric in MetricName::all_metrics() {
        let (_, description) = metric.metadata();
        if metric == MetricName::SourcesRequestDuration {
            ::metrics::describe_histogram!(metric.as_str(), description);
        } else {
            ::metrics::describe_counter!(metric.as_str(), description);
        }
    }
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

// ============================================================================
// Sources Metrics
// ============================================================================

pub mod sources {
    use super::MetricName;

    pub fn request_success(source_id: &str) {
        ::metrics::counter!(MetricName::SourcesRequestsSuccess.as_str(), "source" => source_id.to_string())
            .increment(1);
    }

    pub fn request_error(source_id: &str) {
        ::metrics::counter!(MetricName::SourcesRequestsError.as_str(), "source" => source_id.to_string())
            .increment(1);
    }

    pub fn request_duration(source_id: &str, secs: f64) {
        ::metrics::histogram!(MetricName::SourcesRequestDuration.as_str(), "source" => source_id.to_string())
            .record(secs);
    }
}

// ============================================================================
// Parser Metrics
// ============================================================================

pub mod parser {
    use super::MetricName;

    pub fn tournaments_extracted(source_id: &str, count: usize) {
        ::metrics::counter!(MetricName::ParserTournamentsExtracted.as_str(), "source" => source_id.to_string())
            .increment(count as u64);
    }
}

// ============================================================================
// Geocoding Metrics
// ============================================================================

pub mod geocoding {
    use super::MetricName;

    /// `tier` is one of tournament, location or organizer
    pub fn cache_hit(tier: &'static str) {
        ::metrics::counter!(MetricName::GeocodingCacheHits.as_str(), "tier" => tier).increment(1);
    }

    pub fn query() {
        ::metrics::counter!(MetricName::GeocodingQueries.as_str()).increment(1);
    }

    pub fn query_error() {
        ::metrics::counter!(MetricName::GeocodingQueryErrors.as_str()).increment(1);
    }

    pub fn unresolved() {
        ::metrics::counter!(MetricName::GeocodingUnresolved.as_str()).increment(1);
    }

    pub fn default_coordinates(source_id: &str) {
        ::metrics::counter!(MetricName::GeocodingDefaultCoordinates.as_str(), "source" => source_id.to_string())
            .increment(1);
    }
}

// ============================================================================
// Cache Metrics
// ============================================================================

pub mod cache {
    use super::MetricName;

    pub fn error() {
        ::metrics::counter!(MetricName::CacheErrors.as_str()).increment(1);
    }

    pub fn cleanup_removed(count: usize) {
        ::metrics::counter!(MetricName::CacheCleanupRemoved.as_str()).increment(count as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn metric_names_are_unique_and_prefixed() {
        let names: HashSet<_> = MetricName::all_metrics().map(|m| m.as_str()).collect();
        assert_eq!(names.len(), MetricName::all_metrics().count());
        assert!(names.iter().all(|n| n.starts_with("ttf_")));
    }

    #[test]
    fn recording_without_exporter_is_a_noop() {
        sources::request_success("BAD");
        geocoding::cache_hit("location");
        cache::cleanup_removed(3);
    }
}
