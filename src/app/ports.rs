use crate::catalog::FederationSource;
use crate::error::Result;
use crate::types::Coordinates;
use async_trait::async_trait;
use tracing::warn;

/// Filter sent to a federation listing endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    /// `DD.MM.YYYY`
    pub date_from: String,
    /// `DD.MM.YYYY`
    pub date_to: String,
    /// Competition type as the legacy portals name it, e.g. `Herren+Einzel`
    pub comp_type: Option<String>,
}

impl ListingQuery {
    /// Age category understood by the modern portals; empty selects all
    pub fn age_category(&self) -> &'static str {
        match self.comp_type.as_deref() {
            None | Some("") => "",
            Some("Herren+Einzel" | "Herren+Doppel" | "Damen+Einzel" | "Damen+Doppel") => "general",
            Some("Senioren+Einzel" | "Senioren+Doppel") => "seniors",
            Some("Jugend+Einzel" | "Jugend+Doppel") => "juniors",
            Some(other) => {
                warn!("Unknown competition type: {}. Using default age category", other);
                ""
            }
        }
    }
}

// Ingest-side ports
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Raw listing page of `source` for the given filter
    async fn fetch(&self, source: &FederationSource, query: &ListingQuery) -> Result<String>;
}

// Geocoding port
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Ranked candidates for a free-text place query
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Coordinates>>;
}
