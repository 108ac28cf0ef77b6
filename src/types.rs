use serde::{Deserialize, Serialize};

/// One named sub-event with its skill-level code ("LK")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CompetitionEntry {
    pub competition: String,
    pub skill_level: String,
}

impl CompetitionEntry {
    pub fn new(competition: impl Into<String>, skill_level: impl Into<String>) -> Self {
        Self {
            competition: competition.into(),
            skill_level: skill_level.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.competition.is_empty() && self.skill_level.is_empty()
    }
}

/// A normalized tournament listing row group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Tournament {
    pub id: String,
    pub title: String,
    pub url: String,
    pub date: String,
    pub location: String,
    pub organizer: String,
    pub lat: String,
    pub lon: String,
    pub entries: Vec<CompetitionEntry>,
}

impl Tournament {
    /// Only tournaments with both a title and an identifier are published
    pub fn is_committable(&self) -> bool {
        !self.title.is_empty() && !self.id.is_empty()
    }

    pub fn set_coordinates(&mut self, coordinates: &Coordinates) {
        self.lat = coordinates.lat.clone();
        self.lon = coordinates.lon.clone();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Coordinates {
    pub lat: String,
    pub lon: String,
    pub display_name: String,
}

impl Coordinates {
    pub fn new(lat: impl Into<String>, lon: impl Into<String>) -> Self {
        Self {
            lat: lat.into(),
            lon: lon.into(),
            display_name: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_empty() || self.lon.is_empty()
    }
}

/// Retry metadata of an unresolvable tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureMeta {
    /// Unix timestamp (seconds) of the last geocoding attempt
    pub last_attempt: i64,
    /// Consecutive failures, always >= 1
    pub fail_count: u32,
}

/// Cached outcome of a geocoding attempt.
///
/// Persisted in the flat `{lat, lon, display_name, last_attempt, fail_count, is_failed}`
/// JSON shape; a resolved record never carries failure metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredGeoRecord", into = "StoredGeoRecord")]
pub enum GeoRecord {
    Resolved(Coordinates),
    Failed(FailureMeta),
}

impl GeoRecord {
    pub fn failed(last_attempt: i64, fail_count: u32) -> Self {
        GeoRecord::Failed(FailureMeta {
            last_attempt,
            fail_count: fail_count.max(1),
        })
    }

    pub fn coordinates(&self) -> Option<&Coordinates> {
        match self {
            GeoRecord::Resolved(c) => Some(c),
            GeoRecord::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureMeta> {
        match self {
            GeoRecord::Resolved(_) => None,
            GeoRecord::Failed(meta) => Some(meta),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, GeoRecord::Failed(_))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredGeoRecord {
    #[serde(default)]
    lat: String,
    #[serde(default)]
    lon: String,
    #[serde(default)]
    display_name: String,
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    last_attempt: i64,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    fail_count: u32,
    #[serde(default, skip_serializing_if = "is_false")]
    is_failed: bool,
}

fn is_zero_i64(v: &i64) -> bool {
    *v == 0
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl TryFrom<StoredGeoRecord> for GeoRecord {
    type Error = String;

    fn try_from(stored: StoredGeoRecord) -> std::result::Result<Self, Self::Error> {
        if stored.is_failed {
            return Ok(GeoRecord::failed(stored.last_attempt, stored.fail_count));
        }
        if stored.lat.is_empty() || stored.lon.is_empty() {
            return Err("record is neither resolved nor marked as failed".to_string());
        }
        Ok(GeoRecord::Resolved(Coordinates {
            lat: stored.lat,
            lon: stored.lon,
            display_name: stored.display_name,
        }))
    }
}

impl From<GeoRecord> for StoredGeoRecord {
    fn from(record: GeoRecord) -> Self {
        match record {
            GeoRecord::Resolved(c) => StoredGeoRecord {
                lat: c.lat,
                lon: c.lon,
                display_name: c.display_name,
                ..Default::default()
            },
            GeoRecord::Failed(meta) => StoredGeoRecord {
                last_attempt: meta.last_attempt,
                fail_count: meta.fail_count,
                is_failed: true,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_record_uses_flat_shape() {
        let json = serde_json::to_value(GeoRecord::failed(1_700_000_000, 2)).unwrap();
        assert_eq!(json["is_failed"], true);
        assert_eq!(json["fail_count"], 2);
        assert_eq!(json["lat"], "");
    }

    #[test]
    fn resolved_record_omits_retry_metadata() {
        let record = GeoRecord::Resolved(Coordinates {
            lat: "49.39".into(),
            lon: "8.67".into(),
            display_name: "Heidelberg, Baden-Württemberg, Deutschland".into(),
        });
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("fail_count"));
        let back: GeoRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn rejects_record_without_coordinates_or_failure_flag() {
        let parsed: std::result::Result<GeoRecord, _> =
            serde_json::from_str(r#"{"lat":"","lon":"","display_name":""}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn failed_record_clamps_count_to_one() {
        let parsed: GeoRecord =
            serde_json::from_str(r#"{"lat":"","lon":"","display_name":"","is_failed":true}"#)
                .unwrap();
        assert_eq!(parsed.failure().unwrap().fail_count, 1);
    }
}
