use crate::geo::distance_meters;
use crate::image_cache::{ImageUris, PLACEHOLDER_IMAGE_URI};
use crate::traits::{ImageStore, PlaceLookup};
use crate::{
    CandidateFailure, DiscoveryError, DiscoveryOptions, Enrichment, PhotoSize, PlaceDetails,
    PlaceField, PlacesError, Restaurant, SearchArea, SessionToken, SkipReason,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const UNKNOWN_NAME: &str = "Unknown Restaurant";
const FALLBACK_CUISINE: &str = "Restaurant";

/// Result of enriching one candidate that got past the detail lookup.
#[derive(Debug)]
pub struct Enriched {
    pub enrichment: Enrichment,
    /// Set when the photo fetch failed and the placeholder was used instead.
    pub photo_failure: Option<CandidateFailure>,
}

/// Turns a bare place id into a [`Restaurant`]: details, radius check, photo.
pub struct DetailEnricher<P, S> {
    places: Arc<P>,
    images: Arc<S>,
    uris: ImageUris,
    request_timeout: Duration,
    photo_size: PhotoSize,
}

impl<P, S> Clone for DetailEnricher<P, S> {
    fn clone(&self) -> Self {
        Self {
            places: Arc::clone(&self.places),
            images: Arc::clone(&self.images),
            uris: self.uris.clone(),
            request_timeout: self.request_timeout,
            photo_size: self.photo_size,
        }
    }
}

impl<P, S> DetailEnricher<P, S>
where
    P: PlaceLookup + Send + Sync,
    S: ImageStore + Send + Sync,
{
    pub fn new(
        places: Arc<P>,
        images: Arc<S>,
        options: &DiscoveryOptions,
    ) -> Result<Self, DiscoveryError> {
        Ok(Self {
            places,
            images,
            uris: ImageUris::new(options.image_uri_scheme.clone())?,
            request_timeout: options.request_timeout,
            photo_size: PhotoSize::square(options.photo_max_px),
        })
    }

    pub fn image_uris(&self) -> &ImageUris {
        &self.uris
    }

    /// Enriches `place_id`; with an `area`, places outside it come back as
    /// [`Enrichment::Skipped`].
    pub async fn enrich(
        &self,
        place_id: &str,
        area: Option<SearchArea>,
        session: SessionToken,
    ) -> Result<Enriched, CandidateFailure> {
        let details = with_timeout(
            "fetch_details",
            self.request_timeout,
            self.places
                .fetch_details(place_id, PlaceField::RESTAURANT, session),
        )
        .await
        .map_err(|source| CandidateFailure::DetailFetch {
            place_id: place_id.to_string(),
            source,
        })?;

        if let Some(area) = area {
            let distance = distance_meters(area.origin, details.coordinate);
            if distance > area.radius_meters {
                debug!(
                    place_id,
                    distance_meters = distance,
                    radius_meters = area.radius_meters,
                    "place outside radius"
                );
                return Ok(Enriched {
                    enrichment: Enrichment::Skipped {
                        place_id: place_id.to_string(),
                        reason: SkipReason::OutOfRadius {
                            distance_meters: distance,
                        },
                    },
                    photo_failure: None,
                });
            }
        }

        let first_photo = details.photo_refs.first().cloned();
        let mut restaurant = provisional_restaurant(place_id, details);
        let mut photo_failure = None;

        let image_url = match first_photo {
            Some(photo) => {
                let fetched = with_timeout(
                    "fetch_photo",
                    self.request_timeout,
                    self.places.fetch_photo(&photo, self.photo_size),
                )
                .await
                .and_then(|bytes| {
                    if bytes.is_empty() {
                        Err(PlacesError::Request("photo body was empty".to_string()))
                    } else {
                        Ok(bytes)
                    }
                });

                match fetched {
                    Ok(bytes) => {
                        self.images.put(&restaurant.id, bytes);
                        self.uris.uri_for(&restaurant.id)
                    }
                    Err(source) => {
                        photo_failure = Some(CandidateFailure::PhotoFetch {
                            place_id: restaurant.id.clone(),
                            source,
                        });
                        PLACEHOLDER_IMAGE_URI.to_string()
                    }
                }
            }
            None => PLACEHOLDER_IMAGE_URI.to_string(),
        };
        restaurant.image_url = Some(image_url);

        debug!(place_id = %restaurant.id, name = %restaurant.name, "place enriched");
        Ok(Enriched {
            enrichment: Enrichment::Kept(restaurant),
            photo_failure,
        })
    }
}

fn provisional_restaurant(candidate_id: &str, details: PlaceDetails) -> Restaurant {
    let id = details
        .place_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| candidate_id.to_string());
    let tags = details.category_tags;

    Restaurant {
        id,
        name: details.name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        description: if tags.is_empty() {
            None
        } else {
            Some(tags.join(", "))
        },
        cuisine: tags
            .first()
            .cloned()
            .unwrap_or_else(|| FALLBACK_CUISINE.to_string()),
        rating: details.rating,
        price_level: details.price_level,
        phone_number: details.phone_number,
        address: details.address,
        coordinate: details.coordinate,
        image_url: None,
        category_tags: tags,
    }
}

/// Bounds a provider call; an elapsed deadline becomes [`PlacesError::Timeout`].
pub(crate) async fn with_timeout<T, F>(
    operation: &'static str,
    after: Duration,
    call: F,
) -> Result<T, PlacesError>
where
    F: Future<Output = Result<T, PlacesError>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => Err(PlacesError::Timeout { operation, after }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{distance_meters, offset_north};
    use crate::image_cache::MemoryImageCache;
    use crate::testing::{place, FakePlaces};
    use crate::{Coordinate, PhotoRef};

    const ORIGIN: Coordinate = Coordinate::new(33.59, -7.61);

    fn within(radius_meters: f64) -> Option<SearchArea> {
        Some(SearchArea {
            origin: ORIGIN,
            radius_meters,
        })
    }

    fn enricher(
        places: FakePlaces,
    ) -> (DetailEnricher<FakePlaces, MemoryImageCache>, Arc<MemoryImageCache>) {
        let images = Arc::new(MemoryImageCache::default());
        let options = DiscoveryOptions {
            request_timeout: Duration::from_millis(50),
            ..DiscoveryOptions::default()
        };
        let enricher = DetailEnricher::new(Arc::new(places), Arc::clone(&images), &options)
            .expect("default options are valid");
        (enricher, images)
    }

    fn kept(enriched: Enriched) -> Restaurant {
        match enriched.enrichment {
            Enrichment::Kept(restaurant) => restaurant,
            other => panic!("expected a kept restaurant, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn photo_is_cached_and_referenced_by_uri() {
        let mut details = place("p1", offset_north(ORIGIN, 100.0), Some(4.2));
        details.photo_refs = vec![PhotoRef("photo-1".to_string())];
        let (enricher, images) = enricher(
            FakePlaces::default()
                .with_place(details)
                .with_photo("photo-1", b"jpeg"),
        );

        let enriched = enricher
            .enrich("p1", within(3_000.0), SessionToken::new())
            .await
            .expect("details exist");
        assert!(enriched.photo_failure.is_none());

        let restaurant = kept(enriched);
        let uri = restaurant.image_url.clone().expect("image url is always set");
        assert_eq!(images.resolve(enricher.image_uris(), &uri), Some(b"jpeg".to_vec()));
        assert_eq!(restaurant.cuisine, "restaurant");
        assert_eq!(restaurant.description.as_deref(), Some("restaurant, food"));
    }

    #[tokio::test]
    async fn missing_or_failed_photo_degrades_to_placeholder() {
        let mut with_broken_photo = place("broken", ORIGIN, None);
        with_broken_photo.photo_refs = vec![PhotoRef("gone".to_string())];
        let without_photo = place("plain", ORIGIN, None);
        let (enricher, images) = enricher(
            FakePlaces::default()
                .with_place(with_broken_photo)
                .with_place(without_photo),
        );

        let broken = enricher
            .enrich("broken", None, SessionToken::new())
            .await
            .expect("details exist");
        assert!(matches!(
            broken.photo_failure,
            Some(CandidateFailure::PhotoFetch { .. })
        ));
        assert_eq!(kept(broken).image_url.as_deref(), Some(PLACEHOLDER_IMAGE_URI));

        let plain = enricher
            .enrich("plain", None, SessionToken::new())
            .await
            .expect("details exist");
        assert!(plain.photo_failure.is_none());
        assert_eq!(kept(plain).image_url.as_deref(), Some(PLACEHOLDER_IMAGE_URI));
        assert!(images.is_empty());
    }

    #[tokio::test]
    async fn out_of_radius_is_a_skip_not_an_error() {
        let far = place("far", offset_north(ORIGIN, 3_500.0), Some(5.0));
        let (enricher, _) = enricher(FakePlaces::default().with_place(far));

        let enriched = enricher
            .enrich("far", within(3_000.0), SessionToken::new())
            .await
            .expect("skip is not a failure");
        match enriched.enrichment {
            Enrichment::Skipped {
                place_id,
                reason: SkipReason::OutOfRadius { distance_meters },
            } => {
                assert_eq!(place_id, "far");
                assert!(distance_meters > 3_000.0);
            }
            other => panic!("expected skip, got {other:?}"),
        }

        let anywhere = enricher
            .enrich("far", None, SessionToken::new())
            .await
            .expect("no radius means no filter");
        assert!(matches!(anywhere.enrichment, Enrichment::Kept(_)));
    }

    #[tokio::test]
    async fn place_exactly_on_the_radius_is_kept() {
        let edge = offset_north(ORIGIN, 2_000.0);
        let (enricher, _) = enricher(FakePlaces::default().with_place(place("edge", edge, None)));

        let enriched = enricher
            .enrich("edge", within(distance_meters(ORIGIN, edge)), SessionToken::new())
            .await
            .expect("details exist");
        assert_eq!(kept(enriched).id, "edge");
    }

    #[tokio::test]
    async fn stalled_or_empty_photo_degrades_to_placeholder() {
        let mut slow = place("slow-photo", ORIGIN, None);
        slow.photo_refs = vec![PhotoRef("slow".to_string())];
        let mut empty = place("empty-photo", ORIGIN, None);
        empty.photo_refs = vec![PhotoRef("empty".to_string())];
        let (enricher, images) = enricher(
            FakePlaces::default()
                .with_place(slow)
                .with_place(empty)
                .with_photo("slow", b"jpeg")
                .stalled_photo("slow")
                .with_photo("empty", b""),
        );

        let slow = enricher
            .enrich("slow-photo", None, SessionToken::new())
            .await
            .expect("details exist");
        assert!(matches!(
            slow.photo_failure,
            Some(CandidateFailure::PhotoFetch {
                source: PlacesError::Timeout { operation: "fetch_photo", .. },
                ..
            })
        ));
        assert_eq!(kept(slow).image_url.as_deref(), Some(PLACEHOLDER_IMAGE_URI));

        let empty = enricher
            .enrich("empty-photo", None, SessionToken::new())
            .await
            .expect("details exist");
        assert!(matches!(
            empty.photo_failure,
            Some(CandidateFailure::PhotoFetch {
                source: PlacesError::Request(_),
                ..
            })
        ));
        assert_eq!(kept(empty).image_url.as_deref(), Some(PLACEHOLDER_IMAGE_URI));
        assert!(images.is_empty());
    }

    #[tokio::test]
    async fn detail_failures_and_timeouts_drop_the_candidate() {
        let slow = place("slow", ORIGIN, None);
        let (enricher, _) = enricher(FakePlaces::default().with_place(slow).stalled("slow"));

        let missing = enricher
            .enrich("missing", None, SessionToken::new())
            .await;
        assert!(matches!(
            missing,
            Err(CandidateFailure::DetailFetch {
                source: PlacesError::NotFound(_),
                ..
            })
        ));

        let stalled = enricher.enrich("slow", None, SessionToken::new()).await;
        assert!(matches!(
            stalled,
            Err(CandidateFailure::DetailFetch {
                source: PlacesError::Timeout { .. },
                ..
            })
        ));
    }

    #[test]
    fn sparse_details_use_fallbacks() {
        let details = PlaceDetails {
            place_id: None,
            name: None,
            address: None,
            coordinate: ORIGIN,
            phone_number: None,
            rating: None,
            price_level: None,
            category_tags: Vec::new(),
            photo_refs: Vec::new(),
        };

        let restaurant = provisional_restaurant("candidate", details);
        assert_eq!(restaurant.id, "candidate");
        assert_eq!(restaurant.name, "Unknown Restaurant");
        assert_eq!(restaurant.cuisine, "Restaurant");
        assert_eq!(restaurant.description, None);
        assert_eq!(restaurant.image_url, None);
    }
}
