use crate::geo::distance_meters;
use crate::{Coordinate, Restaurant};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankingPolicy {
    /// Closest first.
    ByDistance(Coordinate),
    /// Highest rated first; unrated places count as 0.
    ByRating,
}

impl RankingPolicy {
    /// Returns a newly ordered copy; ties keep their input order.
    pub fn rank(&self, restaurants: &[Restaurant]) -> Vec<Restaurant> {
        let mut ranked = restaurants.to_vec();
        ranked.sort_by(|left, right| self.compare(left, right));
        ranked
    }

    pub fn compare(&self, left: &Restaurant, right: &Restaurant) -> Ordering {
        match *self {
            Self::ByDistance(origin) => distance_meters(origin, left.coordinate)
                .total_cmp(&distance_meters(origin, right.coordinate)),
            Self::ByRating => rating_or_zero(right).total_cmp(&rating_or_zero(left)),
        }
    }
}

fn rating_or_zero(restaurant: &Restaurant) -> f64 {
    restaurant.rating.unwrap_or(0.0)
}
