use crate::traits::PlaceLookup;
use crate::{
    AutocompleteFilter, Coordinate, PhotoRef, PhotoSize, PlaceCandidate, PlaceDetails,
    PlaceField, PlacesError, SessionToken,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

const STALL: Duration = Duration::from_secs(30);

/// Calls currently running against one endpoint, and the most seen at once.
#[derive(Default)]
pub(crate) struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Scripted provider for pipeline tests.
#[derive(Default)]
pub(crate) struct FakePlaces {
    pub predictions: HashMap<String, Vec<String>>,
    pub failing_queries: HashSet<String>,
    pub stalled_queries: HashSet<String>,
    pub details: HashMap<String, PlaceDetails>,
    pub stalled_details: HashSet<String>,
    pub photos: HashMap<String, Vec<u8>>,
    pub stalled_photos: HashSet<String>,
    /// Latency added to every autocomplete and detail call.
    pub latency: Option<Duration>,
    pub autocomplete_calls: InFlight,
    pub detail_calls: InFlight,
    pub seen_sessions: Mutex<HashSet<SessionToken>>,
    pub seen_filters: Mutex<Vec<AutocompleteFilter>>,
    pub seen_queries: Mutex<Vec<String>>,
}

impl FakePlaces {
    pub fn with_place(mut self, details: PlaceDetails) -> Self {
        if let Some(id) = details.place_id.clone() {
            self.details.insert(id, details);
        }
        self
    }

    pub fn with_predictions(mut self, query: &str, ids: &[&str]) -> Self {
        self.predictions.insert(
            query.to_string(),
            ids.iter().map(|id| id.to_string()).collect(),
        );
        self
    }

    pub fn with_photo(mut self, photo: &str, bytes: &[u8]) -> Self {
        self.photos.insert(photo.to_string(), bytes.to_vec());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn failing_query(mut self, query: &str) -> Self {
        self.failing_queries.insert(query.to_string());
        self
    }

    pub fn stalled_query(mut self, query: &str) -> Self {
        self.stalled_queries.insert(query.to_string());
        self
    }

    pub fn stalled(mut self, place_id: &str) -> Self {
        self.stalled_details.insert(place_id.to_string());
        self
    }

    pub fn stalled_photo(mut self, photo: &str) -> Self {
        self.stalled_photos.insert(photo.to_string());
        self
    }

    fn record_session(&self, session: SessionToken) {
        if let Ok(mut sessions) = self.seen_sessions.lock() {
            sessions.insert(session);
        }
    }

    async fn pause(&self, stalled: bool) {
        if stalled {
            tokio::time::sleep(STALL).await;
        } else if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

pub(crate) fn place(id: &str, coordinate: Coordinate, rating: Option<f64>) -> PlaceDetails {
    PlaceDetails {
        place_id: Some(id.to_string()),
        name: Some(format!("Restaurant {id}")),
        address: Some(format!("{id} street")),
        coordinate,
        phone_number: None,
        rating,
        price_level: None,
        category_tags: vec!["restaurant".to_string(), "food".to_string()],
        photo_refs: Vec::new(),
    }
}

#[async_trait]
impl PlaceLookup for FakePlaces {
    async fn autocomplete(
        &self,
        query: &str,
        filter: &AutocompleteFilter,
        session: SessionToken,
    ) -> Result<Vec<PlaceCandidate>, PlacesError> {
        self.record_session(session);
        if let Ok(mut filters) = self.seen_filters.lock() {
            filters.push(filter.clone());
        }
        if let Ok(mut queries) = self.seen_queries.lock() {
            queries.push(query.to_string());
        }

        self.autocomplete_calls.enter();
        self.pause(self.stalled_queries.contains(query)).await;
        self.autocomplete_calls.leave();

        if self.failing_queries.contains(query) {
            return Err(PlacesError::Request(format!("scripted failure for {query}")));
        }

        Ok(self
            .predictions
            .get(query)
            .map(|ids| ids.iter().map(PlaceCandidate::new).collect())
            .unwrap_or_default())
    }

    async fn fetch_details(
        &self,
        place_id: &str,
        _fields: &[PlaceField],
        session: SessionToken,
    ) -> Result<PlaceDetails, PlacesError> {
        self.record_session(session);

        self.detail_calls.enter();
        self.pause(self.stalled_details.contains(place_id)).await;
        self.detail_calls.leave();

        self.details
            .get(place_id)
            .cloned()
            .ok_or_else(|| PlacesError::NotFound(place_id.to_string()))
    }

    async fn fetch_photo(&self, photo: &PhotoRef, _size: PhotoSize) -> Result<Vec<u8>, PlacesError> {
        if self.stalled_photos.contains(&photo.0) {
            tokio::time::sleep(STALL).await;
        }

        self.photos
            .get(&photo.0)
            .cloned()
            .ok_or_else(|| PlacesError::NotFound(photo.0.clone()))
    }
}
