use crate::app::ports::Geocoder;
use crate::constants::GEOCODER_LANGUAGE;
use crate::error::Result;
use crate::types::Coordinates;
use async_trait::async_trait;

/// OpenStreetMap Nominatim search endpoint
pub struct NominatimGeocoder {
    client: reqwest::Client,
    endpoint: String,
}

impl NominatimGeocoder {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Coordinates>> {
        let limit = limit.to_string();
        let candidates = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("limit", limit.as_str()),
                ("accept-language", GEOCODER_LANGUAGE),
                ("format", "jsonv2"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Coordinates>>()
            .await?;
        Ok(candidates)
    }
}
