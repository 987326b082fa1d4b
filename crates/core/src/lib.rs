pub mod corpus;
pub mod dedup;
pub mod display;
pub mod enrich;
pub mod error;
pub mod geo;
pub mod image_cache;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod ranking;
pub mod traits;

#[cfg(test)]
mod testing;

pub use corpus::{COUNTRYWIDE_QUERIES, NEARBY_QUERIES};
pub use dedup::{DedupSender, Deduplicator, Keyed};
pub use display::{
    filter_restaurants, format_distance, format_distance_from, format_price_level, format_rating,
};
pub use enrich::{DetailEnricher, Enriched};
pub use error::{CandidateFailure, DiscoveryError, PlacesError};
pub use geo::{bounding_box, distance_meters};
pub use image_cache::{
    ImageUris, MemoryImageCache, DEFAULT_CACHE_BUDGET_BYTES, PLACEHOLDER_IMAGE_URI,
};
pub use models::{
    AutocompleteFilter, Coordinate, DiscoveryOptions, DiscoveryReport, DiscoveryRequest,
    Enrichment, LocationAccess, LocationBias, PhotoRef, PhotoSize, PlaceCandidate, PlaceDetails,
    PlaceField, PriceLevel, Restaurant, SearchArea, SessionToken, SkipReason,
    DEFAULT_COUNTRY_CODE, DEFAULT_RADIUS_METERS,
};
pub use orchestrator::{DiscoveryPhase, DiscoveryPipeline};
pub use providers::{FixturePlaces, GooglePlacesClient, DEFAULT_PLACES_URL};
pub use ranking::RankingPolicy;
pub use traits::{ImageStore, PlaceLookup};
