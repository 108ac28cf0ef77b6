use crate::catalog::parse_source_ids;
use crate::config::SchedulerConfig;
use crate::pipeline::{IngestionOrchestrator, IngestionRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Periodic cache warmup over the default date window
pub struct WarmupScheduler {
    orchestrator: Arc<IngestionOrchestrator>,
    interval: Duration,
    request: IngestionRequest,
}

impl WarmupScheduler {
    pub fn new(orchestrator: Arc<IngestionOrchestrator>, config: &SchedulerConfig) -> Self {
        Self {
            orchestrator,
            interval: Duration::from_secs(config.interval_hours.max(1) * 3600),
            request: warmup_request(config),
        }
    }

    /// Run the warmup loop in the background; the first pass starts after one interval
    pub fn start(self) -> JoinHandle<()> {
        info!(
            "Starting scheduler (every {}s, compType={:?}, federations={:?})",
            self.interval.as_secs(),
            self.request.comp_type,
            self.request.federations
        );
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(self.interval);
            // first tick completes immediately
            timer.tick().await;
            loop {
                timer.tick().await;
                info!("Scheduler tick: running warmup job");
                let total = self.orchestrator.warmup(&self.request).await;
                info!("Scheduler warmup done, tournaments fetched: {}", total);
            }
        })
    }
}

/// Dates are left unset so each run covers the window starting that day
fn warmup_request(config: &SchedulerConfig) -> IngestionRequest {
    IngestionRequest {
        date_from: None,
        date_to: None,
        comp_type: config.comp_type.clone().filter(|c| !c.is_empty()),
        federations: config.federations.as_deref().map(parse_source_ids),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_configured_filters_and_rolling_dates() {
        let config = SchedulerConfig {
            enabled: true,
            interval_hours: 12,
            comp_type: Some("Jugend+Einzel".into()),
            federations: Some("WTB,RLP".into()),
        };
        let request = warmup_request(&config);
        assert_eq!(request.date_from, None);
        assert_eq!(request.comp_type.as_deref(), Some("Jugend+Einzel"));
        assert_eq!(
            request.federations,
            Some(vec!["WTB".to_string(), "RLP".to_string()])
        );
    }
}
