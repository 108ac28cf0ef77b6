pub mod http_client;
pub mod nominatim;

pub use http_client::ReqwestPageFetcher;
pub use nominatim::NominatimGeocoder;
