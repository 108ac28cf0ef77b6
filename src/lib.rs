pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod observability;
pub mod parser;
pub mod scheduler;
pub mod server;
pub mod storage;
pub mod types;

// Geocoding and the ingestion pass
pub mod geo;
pub mod pipeline;

// Layered boundaries: ports in `app`, HTTP adapters in `infra`
pub mod app;
pub mod infra;

pub use catalog::{FederationSource, SourceCatalog};
pub use error::{Result, ScraperError};
pub use types::{CompetitionEntry, Coordinates, GeoRecord, Tournament};
