use crate::corpus::{COUNTRYWIDE_QUERIES, NEARBY_QUERIES};
use crate::dedup::{DedupSender, Deduplicator, Keyed};
use crate::enrich::{with_timeout, DetailEnricher, Enriched};
use crate::geo::bounding_box;
use crate::image_cache::ImageUris;
use crate::ranking::RankingPolicy;
use crate::traits::{ImageStore, PlaceLookup};
use crate::{
    AutocompleteFilter, CandidateFailure, Coordinate, DiscoveryError, DiscoveryOptions,
    DiscoveryReport, DiscoveryRequest, Enrichment, PlaceCandidate, Restaurant, SearchArea,
    SessionToken,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Lifecycle of one discovery run. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryPhase {
    Idle,
    AutocompleteFanOut,
    Merging,
    DetailFanOut,
    Ranking,
    Done,
}

impl DiscoveryPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AutocompleteFanOut => "autocomplete_fan_out",
            Self::Merging => "merging",
            Self::DetailFanOut => "detail_fan_out",
            Self::Ranking => "ranking",
            Self::Done => "done",
        }
    }
}

enum DetailOutcome {
    Kept,
    Skipped,
}

/// An enriched restaurant travelling to the output set with its photo failure,
/// so the failure only counts if this copy wins the dedup.
struct KeptPlace {
    restaurant: Restaurant,
    photo_failure: Option<CandidateFailure>,
}

impl Keyed for KeptPlace {
    fn key(&self) -> &str {
        &self.restaurant.id
    }
}

pub struct DiscoveryPipeline<P, S> {
    places: Arc<P>,
    enricher: DetailEnricher<P, S>,
    options: DiscoveryOptions,
}

impl<P, S> DiscoveryPipeline<P, S>
where
    P: PlaceLookup + Send + Sync + 'static,
    S: ImageStore + Send + Sync + 'static,
{
    pub fn new(places: P, images: Arc<S>, options: DiscoveryOptions) -> Result<Self, DiscoveryError> {
        if options.request_timeout.is_zero() {
            return Err(DiscoveryError::Configuration(
                "request timeout must be positive".to_string(),
            ));
        }
        if !(options.meters_per_degree.is_finite() && options.meters_per_degree > 0.0) {
            return Err(DiscoveryError::Configuration(format!(
                "meters per degree must be positive, got {}",
                options.meters_per_degree
            )));
        }
        if options.photo_max_px == 0 {
            return Err(DiscoveryError::Configuration(
                "photo size must be positive".to_string(),
            ));
        }

        let places = Arc::new(places);
        let enricher = DetailEnricher::new(Arc::clone(&places), images, &options)?;
        Ok(Self {
            places,
            enricher,
            options,
        })
    }

    pub fn image_uris(&self) -> &ImageUris {
        self.enricher.image_uris()
    }

    pub async fn discover(&self, request: &DiscoveryRequest) -> Result<DiscoveryReport, DiscoveryError> {
        match request {
            DiscoveryRequest::Nearby {
                origin,
                radius_meters,
            } => self.discover_nearby(*origin, *radius_meters).await,
            DiscoveryRequest::Countrywide { country_code } => {
                self.discover_countrywide(country_code).await
            }
        }
    }

    /// Restaurants within `radius_meters` of `origin`, closest first.
    pub async fn discover_nearby(
        &self,
        origin: Coordinate,
        radius_meters: f64,
    ) -> Result<DiscoveryReport, DiscoveryError> {
        if !origin.is_valid() {
            return Err(DiscoveryError::InvalidArgument(format!(
                "origin {},{} is not a valid coordinate",
                origin.latitude, origin.longitude
            )));
        }
        if !(radius_meters.is_finite() && radius_meters > 0.0) {
            return Err(DiscoveryError::InvalidArgument(format!(
                "radius must be a positive number of meters, got {radius_meters}"
            )));
        }

        let filter = AutocompleteFilter {
            categories: self.options.categories.clone(),
            country_code: None,
            location_bias: Some(bounding_box(
                origin,
                radius_meters,
                self.options.meters_per_degree,
            )),
        };
        let area = SearchArea {
            origin,
            radius_meters,
        };

        self.run(
            &NEARBY_QUERIES,
            filter,
            Some(area),
            RankingPolicy::ByDistance(origin),
        )
        .await
    }

    /// Restaurants anywhere in `country_code` (ISO 3166-1 alpha-2), best rated first.
    pub async fn discover_countrywide(
        &self,
        country_code: &str,
    ) -> Result<DiscoveryReport, DiscoveryError> {
        let country_code = normalize_country_code(country_code)?;
        let filter = AutocompleteFilter {
            categories: self.options.categories.clone(),
            country_code: Some(country_code),
            location_bias: None,
        };

        self.run(&COUNTRYWIDE_QUERIES, filter, None, RankingPolicy::ByRating)
            .await
    }

    async fn run(
        &self,
        queries: &[&str],
        filter: AutocompleteFilter,
        area: Option<SearchArea>,
        ranking: RankingPolicy,
    ) -> Result<DiscoveryReport, DiscoveryError> {
        let started_at = Utc::now();
        let session = SessionToken::new();
        let mut failures = Vec::new();
        enter(DiscoveryPhase::Idle, session);

        enter(DiscoveryPhase::AutocompleteFanOut, session);
        let candidates = self
            .autocomplete_fan_out(queries, filter, session, &mut failures)
            .await;

        enter(DiscoveryPhase::DetailFanOut, session);
        let candidate_count = candidates.len();
        let (collected, skipped) = self
            .detail_fan_out(candidates, area, session, &mut failures)
            .await;

        enter(DiscoveryPhase::Ranking, session);
        let restaurants = ranking.rank(&collected);

        enter(DiscoveryPhase::Done, session);
        info!(
            %session,
            queries = queries.len(),
            candidates = candidate_count,
            restaurants = restaurants.len(),
            skipped,
            failures = failures.len(),
            "discovery finished"
        );

        Ok(DiscoveryReport {
            restaurants,
            failures,
            skipped,
            query_count: queries.len(),
            candidate_count,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn autocomplete_fan_out(
        &self,
        queries: &[&str],
        filter: AutocompleteFilter,
        session: SessionToken,
        failures: &mut Vec<CandidateFailure>,
    ) -> Vec<PlaceCandidate> {
        let filter = Arc::new(filter);
        let (sender, dedup) = Deduplicator::<PlaceCandidate>::channel();
        let mut branches = JoinSet::new();

        for query in queries {
            let places = Arc::clone(&self.places);
            let filter = Arc::clone(&filter);
            let sender = sender.clone();
            let query = query.to_string();
            let timeout = self.options.request_timeout;

            branches.spawn(async move {
                let result =
                    with_timeout("autocomplete", timeout, places.autocomplete(&query, &filter, session))
                        .await;
                match result {
                    Ok(candidates) => {
                        debug!(query = %query, predictions = candidates.len(), "autocomplete branch done");
                        sender.send(candidates);
                        Ok(())
                    }
                    Err(source) => Err(CandidateFailure::Autocomplete { query, source }),
                }
            });
        }
        drop(sender);

        while let Some(joined) = branches.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(failure)) => {
                    warn!(error = %failure, "autocomplete branch failed");
                    failures.push(failure);
                }
                Err(join_error) => {
                    warn!(error = %join_error, "autocomplete branch aborted");
                    failures.push(CandidateFailure::Aborted(join_error.to_string()));
                }
            }
        }

        enter(DiscoveryPhase::Merging, session);
        let candidates = dedup.finish().await;
        info!(%session, unique_places = candidates.len(), "candidates merged");
        candidates
    }

    async fn detail_fan_out(
        &self,
        candidates: Vec<PlaceCandidate>,
        area: Option<SearchArea>,
        session: SessionToken,
        failures: &mut Vec<CandidateFailure>,
    ) -> (Vec<Restaurant>, usize) {
        let (sender, collector) = Deduplicator::<KeptPlace>::channel();
        let mut branches = JoinSet::new();

        for candidate in candidates {
            let enricher = self.enricher.clone();
            let sender = sender.clone();

            branches.spawn(async move { enrich_branch(enricher, candidate, area, session, sender).await });
        }
        drop(sender);

        let mut skipped = 0;
        while let Some(joined) = branches.join_next().await {
            match joined {
                Ok(Ok(DetailOutcome::Kept)) => {}
                Ok(Ok(DetailOutcome::Skipped)) => skipped += 1,
                Ok(Err(failure)) => {
                    warn!(error = %failure, "candidate dropped");
                    failures.push(failure);
                }
                Err(join_error) => {
                    warn!(error = %join_error, "detail branch aborted");
                    failures.push(CandidateFailure::Aborted(join_error.to_string()));
                }
            }
        }

        let mut restaurants = Vec::new();
        for kept in collector.finish().await {
            if let Some(failure) = kept.photo_failure {
                warn!(error = %failure, "photo unavailable");
                failures.push(failure);
            }
            restaurants.push(kept.restaurant);
        }
        (restaurants, skipped)
    }
}

async fn enrich_branch<P, S>(
    enricher: DetailEnricher<P, S>,
    candidate: PlaceCandidate,
    area: Option<SearchArea>,
    session: SessionToken,
    sender: DedupSender<KeptPlace>,
) -> Result<DetailOutcome, CandidateFailure>
where
    P: PlaceLookup + Send + Sync,
    S: ImageStore + Send + Sync,
{
    let Enriched {
        enrichment,
        photo_failure,
    } = enricher.enrich(&candidate.place_id, area, session).await?;

    match enrichment {
        Enrichment::Kept(restaurant) => {
            sender.send(vec![KeptPlace {
                restaurant,
                photo_failure,
            }]);
            Ok(DetailOutcome::Kept)
        }
        Enrichment::Skipped { .. } => Ok(DetailOutcome::Skipped),
    }
}

fn enter(phase: DiscoveryPhase, session: SessionToken) {
    debug!(%session, phase = phase.as_str(), "discovery phase");
}

fn normalize_country_code(raw: &str) -> Result<String, DiscoveryError> {
    let trimmed = raw.trim();
    if trimmed.len() != 2 || !trimmed.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(DiscoveryError::InvalidArgument(format!(
            "country code must be two ASCII letters, got {raw:?}"
        )));
    }
    Ok(trimmed.to_ascii_uppercase())
}
