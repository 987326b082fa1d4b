use crate::error::CandidateFailure;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PriceLevel {
    Free,
    Cheap,
    Medium,
    High,
    Expensive,
    Unknown,
}

/// A fully enriched place, identified by its provider place id.
///
/// Equality and hashing only look at `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub cuisine: String,
    pub rating: Option<f64>,
    pub price_level: Option<PriceLevel>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub coordinate: Coordinate,
    pub image_url: Option<String>,
    pub category_tags: Vec<String>,
}

impl PartialEq for Restaurant {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Restaurant {}

impl Hash for Restaurant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PlaceCandidate {
    pub place_id: String,
}

impl PlaceCandidate {
    pub fn new(place_id: impl Into<String>) -> Self {
        Self {
            place_id: place_id.into(),
        }
    }
}

/// Opaque provider handle for one photo of a place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhotoRef(pub String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaceDetails {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub price_level: Option<PriceLevel>,
    #[serde(default)]
    pub category_tags: Vec<String>,
    #[serde(default)]
    pub photo_refs: Vec<PhotoRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceField {
    Id,
    Name,
    FormattedAddress,
    Location,
    Types,
    PhoneNumber,
    Rating,
    PriceLevel,
    Photos,
}

impl PlaceField {
    pub const RESTAURANT: &'static [PlaceField] = &[
        PlaceField::Id,
        PlaceField::Name,
        PlaceField::FormattedAddress,
        PlaceField::Location,
        PlaceField::Types,
        PlaceField::PhoneNumber,
        PlaceField::Rating,
        PlaceField::PriceLevel,
        PlaceField::Photos,
    ];
}

/// Rectangular area the provider should prefer when ranking predictions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LocationBias {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AutocompleteFilter {
    pub categories: Vec<String>,
    pub country_code: Option<String>,
    pub location_bias: Option<LocationBias>,
}

/// Groups all provider calls of one discovery run into a single billing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(Uuid);

impl SessionToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoSize {
    pub max_width_px: u32,
    pub max_height_px: u32,
}

impl PhotoSize {
    pub const fn square(px: u32) -> Self {
        Self {
            max_width_px: px,
            max_height_px: px,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Upper bound for every single provider call.
    pub request_timeout: Duration,
    pub photo_max_px: u32,
    pub image_uri_scheme: String,
    pub categories: Vec<String>,
    /// Flat-earth conversion used for the autocomplete bias rectangle.
    pub meters_per_degree: f64,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            photo_max_px: 800,
            image_uri_scheme: "restaurant-cache".to_string(),
            categories: vec!["restaurant".to_string(), "food".to_string()],
            meters_per_degree: 111_000.0,
        }
    }
}

/// Radius filter applied to enriched places in nearby mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchArea {
    pub origin: Coordinate,
    pub radius_meters: f64,
}

pub const DEFAULT_RADIUS_METERS: f64 = 3_000.0;
pub const DEFAULT_COUNTRY_CODE: &str = "MA";

/// What the location layer knows about the device when a search starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationAccess {
    Granted(Coordinate),
    Denied,
    Undetermined,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryRequest {
    Nearby { origin: Coordinate, radius_meters: f64 },
    Countrywide { country_code: String },
}

impl DiscoveryRequest {
    /// Nearby search around a known fix, country-wide once access is denied.
    ///
    /// `None` while the user has not answered the permission prompt yet; the
    /// caller asks for access and retries instead of searching.
    pub fn from_access(access: LocationAccess) -> Option<Self> {
        match access {
            LocationAccess::Granted(origin) => Some(Self::Nearby {
                origin,
                radius_meters: DEFAULT_RADIUS_METERS,
            }),
            LocationAccess::Denied => Some(Self::Countrywide {
                country_code: DEFAULT_COUNTRY_CODE.to_string(),
            }),
            LocationAccess::Undetermined => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkipReason {
    OutOfRadius { distance_meters: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment {
    Kept(Restaurant),
    Skipped {
        place_id: String,
        reason: SkipReason,
    },
}

/// Outcome of one discovery run.
///
/// `restaurants` is already ranked; `failures` lists every branch that
/// degraded or dropped a candidate.
#[derive(Debug)]
pub struct DiscoveryReport {
    pub restaurants: Vec<Restaurant>,
    pub failures: Vec<CandidateFailure>,
    pub skipped: usize,
    pub query_count: usize,
    pub candidate_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DiscoveryReport {
    pub fn dropped_count(&self) -> usize {
        self.failures
            .iter()
            .filter(|failure| failure.drops_candidate())
            .count()
    }
}
