//! Geocoding: place-name heuristic, retry backoff and the tiered resolver.

pub mod backoff;
pub mod place_name;
pub mod resolver;

pub use resolver::GeoResolver;
