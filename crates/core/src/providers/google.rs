use crate::traits::PlaceLookup;
use crate::{
    AutocompleteFilter, Coordinate, PhotoRef, PhotoSize, PlaceCandidate, PlaceDetails,
    PlaceField, PlacesError, PriceLevel, SessionToken,
};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use url::Url;

const BACKEND: &str = "google-places";
const API_KEY_HEADER: &str = "X-Goog-Api-Key";
const FIELD_MASK_HEADER: &str = "X-Goog-FieldMask";

pub const DEFAULT_PLACES_URL: &str = "https://places.googleapis.com";

/// Places API (New) over HTTPS.
pub struct GooglePlacesClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl GooglePlacesClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, PlacesError> {
        Ok(Self {
            client: Client::new(),
            base_url: Url::parse(base_url)?,
            api_key: api_key.into(),
        })
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, PlacesError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| PlacesError::Request(format!("{} cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl PlaceLookup for GooglePlacesClient {
    async fn autocomplete(
        &self,
        query: &str,
        filter: &AutocompleteFilter,
        session: SessionToken,
    ) -> Result<Vec<PlaceCandidate>, PlacesError> {
        let url = self.endpoint(["v1", "places:autocomplete"])?;
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(FIELD_MASK_HEADER, "suggestions.placePrediction.placeId")
            .json(&autocomplete_body(query, filter, session))
            .send()
            .await?;

        let payload: AutocompleteResponse = ensure_success(response, query).await?.json().await?;
        Ok(payload
            .suggestions
            .into_iter()
            .filter_map(|suggestion| suggestion.place_prediction)
            .map(|prediction| PlaceCandidate::new(prediction.place_id))
            .collect())
    }

    async fn fetch_details(
        &self,
        place_id: &str,
        fields: &[PlaceField],
        session: SessionToken,
    ) -> Result<PlaceDetails, PlacesError> {
        let mut url = self.endpoint(["v1", "places", place_id])?;
        url.query_pairs_mut()
            .append_pair("sessionToken", &session.to_string());

        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(FIELD_MASK_HEADER, field_mask(fields))
            .send()
            .await?;

        let payload: PlaceResponse = ensure_success(response, place_id).await?.json().await?;
        payload.into_details()
    }

    async fn fetch_photo(&self, photo: &PhotoRef, size: PhotoSize) -> Result<Vec<u8>, PlacesError> {
        let mut url = self.endpoint(
            std::iter::once("v1")
                .chain(photo.0.split('/').filter(|segment| !segment.is_empty()))
                .chain(std::iter::once("media")),
        )?;
        url.query_pairs_mut()
            .append_pair("maxWidthPx", &size.max_width_px.to_string())
            .append_pair("maxHeightPx", &size.max_height_px.to_string());

        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let bytes = ensure_success(response, &photo.0).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

async fn ensure_success(response: Response, subject: &str) -> Result<Response, PlacesError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(PlacesError::NotFound(subject.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    Err(PlacesError::BackendResponse {
        backend: BACKEND.to_string(),
        details: format!("{status}: {}", body.trim()),
    })
}

fn autocomplete_body(query: &str, filter: &AutocompleteFilter, session: SessionToken) -> Value {
    let mut body = Map::new();
    body.insert("input".to_string(), json!(query));
    body.insert("sessionToken".to_string(), json!(session.to_string()));

    if !filter.categories.is_empty() {
        body.insert("includedPrimaryTypes".to_string(), json!(filter.categories));
    }
    if let Some(country) = &filter.country_code {
        body.insert(
            "includedRegionCodes".to_string(),
            json!([country.to_ascii_lowercase()]),
        );
    }
    if let Some(bias) = &filter.location_bias {
        body.insert(
            "locationBias".to_string(),
            json!({
                "rectangle": {
                    "low": lat_lng(bias.south_west),
                    "high": lat_lng(bias.north_east),
                }
            }),
        );
    }

    Value::Object(body)
}

fn lat_lng(coordinate: Coordinate) -> Value {
    json!({
        "latitude": coordinate.latitude,
        "longitude": coordinate.longitude,
    })
}

fn field_mask(fields: &[PlaceField]) -> String {
    fields
        .iter()
        .map(|field| match field {
            PlaceField::Id => "id",
            PlaceField::Name => "displayName",
            PlaceField::FormattedAddress => "formattedAddress",
            PlaceField::Location => "location",
            PlaceField::Types => "types",
            PlaceField::PhoneNumber => "nationalPhoneNumber",
            PlaceField::Rating => "rating",
            PlaceField::PriceLevel => "priceLevel",
            PlaceField::Photos => "photos",
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_price_level(raw: &str) -> PriceLevel {
    match raw {
        "PRICE_LEVEL_FREE" => PriceLevel::Free,
        "PRICE_LEVEL_INEXPENSIVE" => PriceLevel::Cheap,
        "PRICE_LEVEL_MODERATE" => PriceLevel::Medium,
        "PRICE_LEVEL_EXPENSIVE" => PriceLevel::High,
        "PRICE_LEVEL_VERY_EXPENSIVE" => PriceLevel::Expensive,
        _ => PriceLevel::Unknown,
    }
}

#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    #[serde(default)]
    suggestions: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Suggestion {
    place_prediction: Option<PlacePrediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacePrediction {
    place_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceResponse {
    id: Option<String>,
    display_name: Option<LocalizedText>,
    formatted_address: Option<String>,
    location: Option<LatLng>,
    #[serde(default)]
    types: Vec<String>,
    national_phone_number: Option<String>,
    rating: Option<f64>,
    price_level: Option<String>,
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct LocalizedText {
    text: String,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct Photo {
    name: String,
}

impl PlaceResponse {
    fn into_details(self) -> Result<PlaceDetails, PlacesError> {
        let location = self.location.ok_or_else(|| PlacesError::BackendResponse {
            backend: BACKEND.to_string(),
            details: format!(
                "place {} has no location",
                self.id.as_deref().unwrap_or("<unknown>")
            ),
        })?;

        Ok(PlaceDetails {
            place_id: self.id,
            name: self.display_name.map(|name| name.text),
            address: self.formatted_address,
            coordinate: Coordinate::new(location.latitude, location.longitude),
            phone_number: self.national_phone_number,
            rating: self.rating,
            price_level: self.price_level.as_deref().map(parse_price_level),
            category_tags: self.types,
            photo_refs: self.photos.into_iter().map(|photo| PhotoRef(photo.name)).collect(),
        })
    }
}
