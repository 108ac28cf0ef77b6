/// Federation identifiers used by the built-in catalog and the `federations` filter
pub const BAD: &str = "BAD";
pub const HTV: &str = "HTV";
pub const RLP: &str = "RLP";
pub const STV: &str = "STV";
pub const TMV: &str = "TMV";
pub const TSA: &str = "TSA";
pub const TTV: &str = "TTV";
pub const TVN: &str = "TVN";
pub const WTB: &str = "WTB";

// Query parameter prefixes of the modern listing portals
pub const MODERN_PREFIX_RLP: &str = "tx_nuportalrs_nuportalrs";
pub const MODERN_PREFIX_DEFAULT: &str = "tx_nuportalrs_tournaments";

// Markers inside detail-page URLs that precede the tournament identifier
pub const LEGACY_ID_MARKER: &str = "tournamentId=";
pub const MODERN_ID_MARKER: &str = "detail/";

// Labels printed in the modern listing's tournament paragraph
pub const ORGANIZER_LABEL: &str = "Veranstalter";
pub const ORGANIZER_START: &str = "Veranstalter: ";
pub const ORGANIZER_END: &str = " Austragungsort";
pub const LOCATION_START: &str = "Austragungsort: ";
/// Terminating labels after the venue, tried in order (WTB first, then RLP)
pub const LOCATION_ENDS: [&str; 2] = [" Meldeschluss", " Offen für"];

/// Separator between anchor text and address block in the legacy title cell
pub const LEGACY_ORGANIZER_SEPARATOR: &str = "\n\t\n\n\n";

/// Date format expected by every listing endpoint
pub const LISTING_DATE_FORMAT: &str = "%d.%m.%Y";
/// Width of the default listing window
pub const DEFAULT_WINDOW_DAYS: i64 = 14;

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search.php";
/// Ranked candidates requested per geocoding query
pub const GEOCODER_RESULT_LIMIT: u32 = 3;
pub const GEOCODER_LANGUAGE: &str = "de";

pub const DEFAULT_CACHE_PATH: &str = "./data/cache.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

// Housekeeping thresholds evaluated by the HTTP handler before each listing
pub const CLEANUP_TRIGGER_TOTAL: usize = 1000;
pub const CLEANUP_TRIGGER_PERMANENT: usize = 100;
