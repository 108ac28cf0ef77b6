// Ingestion pass: concurrent per-source fetch, extraction and geocoding

pub mod orchestrator;

pub use orchestrator::{IngestionOrchestrator, IngestionRequest};
