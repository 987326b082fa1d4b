use crate::geo::distance_meters;
use crate::{Coordinate, PriceLevel, Restaurant};

const NOT_AVAILABLE: &str = "N/A";

impl PriceLevel {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Cheap => "$",
            Self::Medium => "$$",
            Self::High => "$$$",
            Self::Expensive => "$$$$",
            Self::Unknown => NOT_AVAILABLE,
        }
    }
}

pub fn format_price_level(level: Option<PriceLevel>) -> &'static str {
    level.map_or(NOT_AVAILABLE, |level| level.symbol())
}

pub fn format_rating(rating: Option<f64>) -> String {
    rating.map_or_else(|| NOT_AVAILABLE.to_string(), |value| format!("{value:.1}"))
}

/// `"850 m"` below a kilometer, `"1.2 km"` from there on.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1_000.0 {
        format!("{:.1} km", meters / 1_000.0)
    } else {
        format!("{meters:.0} m")
    }
}

pub fn format_distance_from(origin: Coordinate, restaurant: &Restaurant) -> String {
    format_distance(distance_meters(origin, restaurant.coordinate))
}

/// Case-insensitive match on name, cuisine or address. Empty text keeps everything.
pub fn filter_restaurants(restaurants: &[Restaurant], text: &str) -> Vec<Restaurant> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return restaurants.to_vec();
    }

    restaurants
        .iter()
        .filter(|restaurant| {
            restaurant.name.to_lowercase().contains(&needle)
                || restaurant.cuisine.to_lowercase().contains(&needle)
                || restaurant
                    .address
                    .as_deref()
                    .is_some_and(|address| address.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}
