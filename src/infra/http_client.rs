use crate::app::ports::{ListingQuery, PageFetcher};
use crate::catalog::{Dialect, FederationSource};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, info};

// Fixed legacy form fields: LK valuation status and the national region
const LEGACY_VALUATION_STATE: &str = "1";
const LEGACY_REGION: &str = "DE";

// Fixed modern filter fields
const MODERN_FED_RANK_VALUATION: &str = "true";
const MODERN_FIRST_RESULT: &str = "0";
const MODERN_MAX_RESULTS: &str = "100";

/// Fetches listing pages over HTTP in the shape each dialect expects
pub struct ReqwestPageFetcher {
    client: reqwest::Client,
}

impl ReqwestPageFetcher {
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Form body of the legacy tournament calendar search
pub fn legacy_form(source: &FederationSource, query: &ListingQuery) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("queryName", String::new()),
        ("queryDateFrom", query.date_from.clone()),
        ("queryDateTo", query.date_to.clone()),
        ("valuationState", LEGACY_VALUATION_STATE.to_string()),
        ("federation", source.id.clone()),
        ("region", LEGACY_REGION.to_string()),
    ];
    if let Some(comp_type) = query.comp_type.as_deref().filter(|c| !c.is_empty()) {
        form.push(("compType", comp_type.to_string()));
    }
    form
}

/// Bracketed query parameters of the modern tournament filter
pub fn modern_params(
    param_prefix: &str,
    trusted_properties: &str,
    query: &ListingQuery,
) -> Vec<(String, String)> {
    let filter = |field: &str| format!("{}[tournamentsFilter][{}]", param_prefix, field);
    vec![
        (
            format!("{}[__trustedProperties]", param_prefix),
            trusted_properties.to_string(),
        ),
        (filter("ageCategory"), query.age_category().to_string()),
        (filter("fedRankValuation"), MODERN_FED_RANK_VALUATION.to_string()),
        (filter("startDate"), query.date_from.clone()),
        (filter("endDate"), query.date_to.clone()),
        (filter("firstResult"), MODERN_FIRST_RESULT.to_string()),
        (filter("maxResults"), MODERN_MAX_RESULTS.to_string()),
    ]
}

#[async_trait]
impl PageFetcher for ReqwestPageFetcher {
    async fn fetch(&self, source: &FederationSource, query: &ListingQuery) -> Result<String> {
        info!(
            "Get Tournaments in: {} from: {} to: {}, compType: {}",
            source.id,
            query.date_from,
            query.date_to,
            query.comp_type.as_deref().unwrap_or("")
        );
        let started = Instant::now();

        let request = match &source.dialect {
            Dialect::Legacy => self.client.post(&source.url).form(&legacy_form(source, query)),
            Dialect::Modern {
                param_prefix,
                trusted_properties,
            } => self
                .client
                .get(&source.url)
                .query(&modern_params(param_prefix, trusted_properties, query)),
        };

        let body = request.send().await?.error_for_status()?.text().await?;
        debug!(
            source = %source.id,
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched listing page"
        );
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SourceCatalog;

    fn query(comp_type: Option<&str>) -> ListingQuery {
        ListingQuery {
            date_from: "01.06.2026".into(),
            date_to: "15.06.2026".into(),
            comp_type: comp_type.map(str::to_string),
        }
    }

    #[test]
    fn legacy_form_includes_comp_type_only_when_set() {
        let catalog = SourceCatalog::builtin();
        let source = catalog.get("HTV").unwrap();

        let form = legacy_form(source, &query(None));
        assert!(form.iter().all(|(k, _)| *k != "compType"));
        assert!(form.contains(&("federation", "HTV".to_string())));

        let form = legacy_form(source, &query(Some("Herren+Einzel")));
        assert!(form.contains(&("compType", "Herren+Einzel".to_string())));
    }

    #[test]
    fn modern_params_use_prefix_and_age_category() {
        let params = modern_params("tx_nuportalrs_tournaments", "blob", &query(Some("Jugend+Einzel")));
        assert_eq!(params[0].0, "tx_nuportalrs_tournaments[__trustedProperties]");
        assert!(params.contains(&(
            "tx_nuportalrs_tournaments[tournamentsFilter][ageCategory]".to_string(),
            "juniors".to_string()
        )));
        assert!(params.contains(&(
            "tx_nuportalrs_tournaments[tournamentsFilter][startDate]".to_string(),
            "01.06.2026".to_string()
        )));
    }
}
