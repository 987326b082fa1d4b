use crate::traits::PlaceLookup;
use crate::{
    AutocompleteFilter, PhotoRef, PhotoSize, PlaceCandidate, PlaceDetails, PlaceField,
    PlacesError, SessionToken,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const BACKEND: &str = "fixture";

/// Offline provider backed by a JSON document.
///
/// ```json
/// {
///   "predictions": { "restaurant": ["p1", "p2"] },
///   "places": { "p1": { "place_id": "p1", "coordinate": { "latitude": 33.5, "longitude": -7.6 } } },
///   "photos": { "photo-1": "<base64>" }
/// }
/// ```
#[derive(Debug, Default)]
pub struct FixturePlaces {
    predictions: HashMap<String, Vec<String>>,
    places: HashMap<String, PlaceDetails>,
    photos: HashMap<String, Vec<u8>>,
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    predictions: HashMap<String, Vec<String>>,
    #[serde(default)]
    places: HashMap<String, PlaceDetails>,
    #[serde(default)]
    photos: HashMap<String, String>,
}

impl FixturePlaces {
    pub fn from_json(raw: &str) -> Result<Self, PlacesError> {
        let file: FixtureFile = serde_json::from_str(raw)?;

        let mut photos = HashMap::with_capacity(file.photos.len());
        for (name, encoded) in file.photos {
            let bytes = STANDARD
                .decode(encoded.trim())
                .map_err(|err| PlacesError::BackendResponse {
                    backend: BACKEND.to_string(),
                    details: format!("photo {name} is not valid base64: {err}"),
                })?;
            photos.insert(name, bytes);
        }

        let places = file
            .places
            .into_iter()
            .map(|(id, mut details)| {
                details.place_id.get_or_insert_with(|| id.clone());
                (id, details)
            })
            .collect();

        Ok(Self {
            predictions: file.predictions,
            places,
            photos,
        })
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, PlacesError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let fixture = Self::from_json(&raw)?;
        debug!(
            path = %path.display(),
            places = fixture.places.len(),
            queries = fixture.predictions.len(),
            "loaded places fixture"
        );
        Ok(fixture)
    }
}

#[async_trait]
impl PlaceLookup for FixturePlaces {
    async fn autocomplete(
        &self,
        query: &str,
        _filter: &AutocompleteFilter,
        _session: SessionToken,
    ) -> Result<Vec<PlaceCandidate>, PlacesError> {
        Ok(self
            .predictions
            .get(query)
            .map(|ids| ids.iter().cloned().map(PlaceCandidate::new).collect())
            .unwrap_or_default())
    }

    async fn fetch_details(
        &self,
        place_id: &str,
        _fields: &[PlaceField],
        _session: SessionToken,
    ) -> Result<PlaceDetails, PlacesError> {
        self.places
            .get(place_id)
            .cloned()
            .ok_or_else(|| PlacesError::NotFound(place_id.to_string()))
    }

    async fn fetch_photo(&self, photo: &PhotoRef, _size: PhotoSize) -> Result<Vec<u8>, PlacesError> {
        self.photos
            .get(&photo.0)
            .cloned()
            .ok_or_else(|| PlacesError::NotFound(photo.0.clone()))
    }
}
