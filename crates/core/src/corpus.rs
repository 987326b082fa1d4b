/// Autocomplete has no "everything near X" primitive, so each run issues a
/// fixed multilingual set of free-text queries and merges the predictions.
pub const NEARBY_QUERIES: [&str; 12] = [
    "restaurant",
    "مطعم",
    "restaurant traditionnel",
    "restaurant marocain",
    "café restaurant",
    "restaurant grill",
    "restaurant poisson",
    "restaurant pizza",
    "restaurant fast food",
    "snack",
    "bistro",
    "restaurant halal",
];

/// Country-wide runs skip the neighbourhood-style terms.
pub const COUNTRYWIDE_QUERIES: [&str; 9] = [
    "restaurant",
    "مطعم",
    "restaurant traditionnel",
    "restaurant marocain",
    "café restaurant",
    "restaurant grill",
    "restaurant poisson",
    "restaurant pizza",
    "restaurant fast food",
];
