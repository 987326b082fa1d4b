mod fixture;
mod google;

pub use fixture::FixturePlaces;
pub use google::{GooglePlacesClient, DEFAULT_PLACES_URL};
