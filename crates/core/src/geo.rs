use crate::{Coordinate, LocationBias};

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance in meters (haversine).
pub fn distance_meters(from: Coordinate, to: Coordinate) -> f64 {
    let dlat = (to.latitude - from.latitude).to_radians();
    let dlng = (to.longitude - from.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (dlng / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Square bias area of `radius_meters` around `origin`.
///
/// Uses a flat `meters_per_degree` on both axes, so the box is too narrow in
/// longitude away from the equator and meaningless near the poles.
pub fn bounding_box(origin: Coordinate, radius_meters: f64, meters_per_degree: f64) -> LocationBias {
    let delta = radius_meters / meters_per_degree;
    LocationBias {
        south_west: Coordinate::new(origin.latitude - delta, origin.longitude - delta),
        north_east: Coordinate::new(origin.latitude + delta, origin.longitude + delta),
    }
}

/// Point `meters` due north of `origin`.
pub fn offset_north(origin: Coordinate, meters: f64) -> Coordinate {
    let delta = (meters / EARTH_RADIUS_METERS).to_degrees();
    Coordinate::new(origin.latitude + delta, origin.longitude)
}
