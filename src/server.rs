use crate::catalog::parse_source_ids;
use crate::constants::{CLEANUP_TRIGGER_PERMANENT, CLEANUP_TRIGGER_TOTAL};
use crate::observability::cache as cache_metrics;
use crate::pipeline::{IngestionOrchestrator, IngestionRequest};
use crate::storage::CacheStore;
use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use hyper::Server;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<IngestionOrchestrator>,
    pub store: Arc<CacheStore>,
}

/// Query string of the listing endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ListingParams {
    #[serde(rename = "dateFrom")]
    pub date_from: Option<String>,
    #[serde(rename = "dateTo")]
    pub date_to: Option<String>,
    #[serde(rename = "compType")]
    pub comp_type: Option<String>,
    /// Comma-separated source ids
    pub federations: Option<String>,
}

impl From<ListingParams> for IngestionRequest {
    fn from(params: ListingParams) -> Self {
        IngestionRequest {
            date_from: params.date_from,
            date_to: params.date_to,
            comp_type: params.comp_type,
            federations: params.federations.as_deref().map(parse_source_ids),
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "ttf_scraper",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn tournaments(
    State(state): State<AppState>,
    Query(params): Query<ListingParams>,
) -> impl IntoResponse {
    housekeeping(&state.store);
    let request = IngestionRequest::from(params);
    Json(state.orchestrator.fetch_and_geocode(&request).await)
}

async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.statistics(chrono::Utc::now().timestamp()) {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            error!("Failed to compute cache statistics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Log cache statistics and sweep stale failures once the cache has grown large
pub fn housekeeping(store: &CacheStore) {
    let stats = match store.statistics(chrono::Utc::now().timestamp()) {
        Ok(stats) => stats,
        Err(e) => {
            error!("Failed to compute cache statistics: {}", e);
            cache_metrics::error();
            return;
        }
    };
    info!(
        "Cache stats - Total: {}, Successful: {}, Failed: {}, Pending retry: {}, Permanently failed: {}",
        stats.total_entries,
        stats.successful,
        stats.failed,
        stats.pending_retry,
        stats.permanently_failed
    );

    if stats.total_entries > CLEANUP_TRIGGER_TOTAL
        && stats.permanently_failed > CLEANUP_TRIGGER_PERMANENT
    {
        match store.cleanup_old_failed_entries() {
            Ok(removed) => cache_metrics::cleanup_removed(removed),
            Err(e) => error!("Cache cleanup failed: {}", e),
        }
    }
}

pub fn create_server(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/", get(tournaments))
        .route("/stats", get(stats))
        .route("/health", get(health))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_server(state);
    info!("HTTP server running on http://{}", addr);
    Server::bind(&addr).serve(app.into_make_service()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::{Geocoder, ListingQuery, PageFetcher};
    use crate::catalog::{FederationSource, SourceCatalog};
    use crate::error::Result;
    use crate::geo::GeoResolver;
    use crate::types::{Coordinates, Tournament};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct EmptyListing;

    #[async_trait]
    impl PageFetcher for EmptyListing {
        async fn fetch(&self, _source: &FederationSource, _query: &ListingQuery) -> Result<String> {
            Ok("<html><body><table class=\"result-set\"></table></body></html>".to_string())
        }
    }

    struct NoGeocoder;

    #[async_trait]
    impl Geocoder for NoGeocoder {
        async fn search(&self, _query: &str, _limit: u32) -> Result<Vec<Coordinates>> {
            Ok(Vec::new())
        }
    }

    fn state() -> AppState {
        let store = Arc::new(CacheStore::in_memory().unwrap());
        let resolver = Arc::new(GeoResolver::new(store.clone(), Arc::new(NoGeocoder)));
        let orchestrator = Arc::new(IngestionOrchestrator::new(
            SourceCatalog::builtin(),
            Arc::new(EmptyListing),
            resolver,
        ));
        AppState { orchestrator, store }
    }

    #[test]
    fn federations_parameter_is_split() {
        let request = IngestionRequest::from(ListingParams {
            federations: Some("BAD, HTV".into()),
            ..Default::default()
        });
        assert_eq!(request.federations, Some(vec!["BAD".to_string(), "HTV".to_string()]));
    }

    #[tokio::test]
    async fn listing_endpoint_returns_json_array_with_cors() {
        let app = create_server(state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/?federations=BAD&dateFrom=01.06.2026")
                    .header("Origin", "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let tournaments: Vec<Tournament> = serde_json::from_slice(&body).unwrap();
        assert!(tournaments.is_empty());
    }

    #[tokio::test]
    async fn stats_endpoint_reports_counts() {
        let app = create_server(state());
        let response = app
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(stats["total_entries"], 0);
    }
}
