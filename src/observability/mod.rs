// Observability: metrics recorders and exporter setup

pub mod metrics;

pub use metrics::{cache, geocoding, init, parser, sources, MetricName};
