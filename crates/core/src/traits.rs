use crate::{
    AutocompleteFilter, PhotoRef, PhotoSize, PlaceCandidate, PlaceDetails, PlaceField,
    PlacesError, SessionToken,
};
use async_trait::async_trait;

#[async_trait]
pub trait PlaceLookup {
    async fn autocomplete(
        &self,
        query: &str,
        filter: &AutocompleteFilter,
        session: SessionToken,
    ) -> Result<Vec<PlaceCandidate>, PlacesError>;

    async fn fetch_details(
        &self,
        place_id: &str,
        fields: &[PlaceField],
        session: SessionToken,
    ) -> Result<PlaceDetails, PlacesError>;

    async fn fetch_photo(&self, photo: &PhotoRef, size: PhotoSize) -> Result<Vec<u8>, PlacesError>;
}

/// Process-wide keyed store for downloaded place photos.
pub trait ImageStore {
    fn put(&self, key: &str, bytes: Vec<u8>);

    fn get(&self, key: &str) -> Option<Vec<u8>>;
}
