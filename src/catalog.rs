//! Static descriptors of the regional federations whose listings are scraped.

use crate::constants;
use crate::parser::{LegacyExtractor, ModernExtractor, TableExtractor};
use crate::types::Coordinates;

/// Request and markup shape used by a federation portal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialect {
    /// Form-post endpoint returning a flat, rowspan-grouped result table
    Legacy,
    /// Query-parameter endpoint returning nested paragraph/sub-table rows
    Modern {
        /// Prefix of the bracketed query parameters, e.g. `tx_nuportalrs_tournaments`
        param_prefix: String,
        /// Opaque `__trustedProperties` blob the portal requires
        trusted_properties: String,
    },
}

impl Dialect {
    pub fn extractor(&self) -> &'static dyn TableExtractor {
        static LEGACY: LegacyExtractor = LegacyExtractor;
        static MODERN: ModernExtractor = ModernExtractor;
        match self {
            Dialect::Legacy => &LEGACY,
            Dialect::Modern { .. } => &MODERN,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Legacy => "legacy",
            Dialect::Modern { .. } => "modern",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FederationSource {
    pub id: String,
    pub url: String,
    pub name: String,
    /// Used when a tournament cannot be geocoded
    pub default_coordinates: Coordinates,
    /// Region name a geocoding candidate must mention to be accepted
    pub region: String,
    pub dialect: Dialect,
}

impl FederationSource {
    fn legacy(id: &str, host: &str, name: &str, lat: &str, lon: &str, region: &str) -> Self {
        Self {
            id: id.to_string(),
            url: format!(
                "https://{}/cgi-bin/WebObjects/nuLigaTENDE.woa/wa/tournamentCalendar",
                host
            ),
            name: name.to_string(),
            default_coordinates: Coordinates::new(lat, lon),
            region: region.to_string(),
            dialect: Dialect::Legacy,
        }
    }
}

/// The set of federations known to this process
#[derive(Debug, Clone, Default)]
pub struct SourceCatalog {
    sources: Vec<FederationSource>,
}

impl SourceCatalog {
    pub fn new(sources: Vec<FederationSource>) -> Self {
        Self { sources }
    }

    /// Federations scraped in production
    pub fn builtin() -> Self {
        let sources = vec![
            FederationSource::legacy(
                constants::BAD,
                "baden.liga.nu",
                "Badischer Tennisverband",
                "49.34003",
                "8.68514",
                "Baden-Württemberg",
            ),
            FederationSource::legacy(
                constants::HTV,
                "htv.liga.nu",
                "Hessischer Tennisverband",
                "50.0770372",
                "8.7553832",
                "Hessen",
            ),
            FederationSource {
                id: constants::RLP.to_string(),
                url: "https://www.rlp-tennis.de/spielbetrieb/turniere/appTournament.html".to_string(),
                name: "Rheinland-Pfälzischer Tennisverband".to_string(),
                default_coordinates: Coordinates::new("49.8335079", "8.0138431"),
                region: "Rheinland-Pfalz".to_string(),
                dialect: Dialect::Modern {
                    param_prefix: constants::MODERN_PREFIX_RLP.to_string(),
                    trusted_properties: "{\"tournamentsFilter\":{\"ageCategory\":1,\"ageGroupJuniors\":1,\"ageGroupSeniors\":1,\"circuit\":1,\"region\":1,\"fedRankValuation\":1,\"nationalValuation\":1,\"fedRank\":1,\"name\":1,\"city\":1,\"startDate\":1,\"endDate\":1,\"firstResult\":1,\"maxResults\":1}}8732571a008a8bee386504005773291f579958de".to_string(),
                },
            },
            FederationSource::legacy(
                constants::STV,
                "stv.liga.nu",
                "Sächsischer Tennisverband",
                "51.3633218",
                "12.4132917",
                "Sachsen",
            ),
            FederationSource::legacy(
                constants::TMV,
                "tmv.liga.nu",
                "Tennisverband Mecklenburg-Vorpommern",
                "54.0829601",
                "12.0889703",
                "Mecklenburg-Vorpommern",
            ),
            FederationSource::legacy(
                constants::TSA,
                "tsa.liga.nu",
                "Tennisverband Sachsen-Anhalt",
                "52.1063933",
                "11.6015097",
                "Sachsen-Anhalt",
            ),
            FederationSource::legacy(
                constants::TTV,
                "ttv.liga.nu",
                "Thüringer Tennisverband",
                "51.0012441",
                "11.3327579",
                "Thüringen",
            ),
            FederationSource::legacy(
                constants::TVN,
                "tvn.liga.nu",
                "Tennisverband Niederrhein",
                "51.4784721",
                "6.9804422",
                "Nordrhein-Westfalen",
            ),
            FederationSource {
                id: constants::WTB.to_string(),
                url: "https://www.wtb-tennis.de/turniere/turnierkalender/app/nuTournaments.html".to_string(),
                name: "Württembergischer Tennisbund".to_string(),
                default_coordinates: Coordinates::new("48.853488", "9.1373019"),
                region: "Baden-Württemberg".to_string(),
                dialect: Dialect::Modern {
                    param_prefix: constants::MODERN_PREFIX_DEFAULT.to_string(),
                    trusted_properties: "a:1:{s:17:\"tournamentsFilter\";a:15:{s:11:\"ageCategory\";i:1;s:15:\"ageGroupJuniors\";i:1;s:15:\"ageGroupSeniors\";i:1;s:7:\"circuit\";i:1;s:16:\"fedRankValuation\";i:1;s:17:\"nationalValuation\";i:1;s:4:\"type\";i:1;s:7:\"fedRank\";i:1;s:6:\"region\";i:1;s:4:\"name\";i:1;s:4:\"city\";i:1;s:9:\"startDate\";i:1;s:7:\"endDate\";i:1;s:11:\"firstResult\";i:1;s:10:\"maxResults\";i:1;}}0084e646e91ed3b7e155957c5d3b286f2602eebc".to_string(),
                },
            },
        ];
        Self { sources }
    }

    pub fn all(&self) -> &[FederationSource] {
        &self.sources
    }

    pub fn get(&self, id: &str) -> Option<&FederationSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Resolve a requested subset; `None` or an empty list selects every source.
    /// Unknown identifiers are ignored and catalog order is preserved.
    pub fn select(&self, ids: Option<&[String]>) -> Vec<FederationSource> {
        match ids {
            Some(ids) if !ids.is_empty() => self
                .sources
                .iter()
                .filter(|s| ids.iter().any(|id| id.trim() == s.id))
                .cloned()
                .collect(),
            _ => self.sources.clone(),
        }
    }
}

/// Split a comma-separated `federations` parameter into trimmed, non-empty ids
pub fn parse_source_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_nine_federations() {
        let catalog = SourceCatalog::builtin();
        assert_eq!(catalog.all().len(), 9);
        let modern: Vec<_> = catalog
            .all()
            .iter()
            .filter(|s| matches!(s.dialect, Dialect::Modern { .. }))
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(modern, vec!["RLP", "WTB"]);
    }

    #[test]
    fn rlp_uses_its_own_parameter_prefix() {
        let catalog = SourceCatalog::builtin();
        match &catalog.get("RLP").unwrap().dialect {
            Dialect::Modern { param_prefix, .. } => {
                assert_eq!(param_prefix, "tx_nuportalrs_nuportalrs")
            }
            other => panic!("unexpected dialect {:?}", other),
        }
    }

    #[test]
    fn select_ignores_unknown_ids() {
        let catalog = SourceCatalog::builtin();
        let ids = parse_source_ids(" HTV, XYZ ,BAD,");
        let selected: Vec<_> = catalog
            .select(Some(&ids))
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(selected, vec!["BAD", "HTV"]);
    }

    #[test]
    fn empty_selection_means_all() {
        let catalog = SourceCatalog::builtin();
        assert_eq!(catalog.select(Some(&[])).len(), 9);
        assert_eq!(catalog.select(None).len(), 9);
    }
}
