//! Reverse geocoding: convert coordinates to a human-readable place.
//!
//! Display enrichment only; it must never block or fail the forecast
//! pipeline. Two stages: Nominatim (OpenStreetMap) primary, a REST
//! reverse geocoder secondary. All failures are swallowed.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::types::{Coordinate, Place};

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
const FALLBACK_URL: &str = "https://api.bigdatacloud.net";
const REQUEST_TIMEOUT_SECS: u64 = 5;
const USER_AGENT: &str = "Stormwarn/0.1.0 (https://github.com/stormwarn)";

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BigDataCloudResponse {
    city: Option<String>,
    locality: Option<String>,
    #[serde(rename = "countryName")]
    country_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    client: Option<Client>,
    primary_base: String,
    secondary_base: String,
}

impl Default for Geocoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Geocoder {
    pub fn new() -> Self {
        Self::with_base_urls(NOMINATIM_URL, FALLBACK_URL)
    }

    pub fn with_base_urls(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        let client = match Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
        {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!("Failed to create geocoding client: {}", e);
                None
            }
        };

        Self {
            client,
            primary_base: primary.into(),
            secondary_base: secondary.into(),
        }
    }

    /// Reverse geocode to `{city, country}`. Never fails; returns an
    /// unknown place when both stages come back empty, letting the
    /// caller fall back to raw coordinates.
    pub async fn reverse(&self, coordinate: Coordinate) -> Place {
        let Some(client) = &self.client else {
            return Place::unknown();
        };

        if let Some(place) = self.reverse_nominatim(client, coordinate).await {
            tracing::debug!(?place, "Reverse geocoded via primary");
            return place;
        }

        if let Some(place) = self.reverse_secondary(client, coordinate).await {
            tracing::debug!(?place, "Reverse geocoded via secondary");
            return place;
        }

        tracing::debug!(%coordinate, "Reverse geocoding failed on both stages");
        Place::unknown()
    }

    async fn reverse_nominatim(&self, client: &Client, coordinate: Coordinate) -> Option<Place> {
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=json&addressdetails=1&zoom=10",
            self.primary_base, coordinate.latitude, coordinate.longitude
        );

        let response = match client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Primary reverse geocode request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Primary reverse geocode returned {}", response.status());
            return None;
        }

        let body: NominatimResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("Primary reverse geocode parse error: {}", e);
                return None;
            }
        };

        let addr = body.address?;
        let city = addr.city.or(addr.town).or(addr.village).or(addr.municipality);
        let place = Place {
            city,
            country: addr.country,
        };
        (!place.is_unknown()).then_some(place)
    }

    async fn reverse_secondary(&self, client: &Client, coordinate: Coordinate) -> Option<Place> {
        let url = format!(
            "{}/data/reverse-geocode-client?latitude={}&longitude={}&localityLanguage=en",
            self.secondary_base, coordinate.latitude, coordinate.longitude
        );

        let response = match client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Secondary reverse geocode request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Secondary reverse geocode returned {}", response.status());
            return None;
        }

        let body: BigDataCloudResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("Secondary reverse geocode parse error: {}", e);
                return None;
            }
        };

        let city = body
            .city
            .filter(|c| !c.is_empty())
            .or(body.locality.filter(|l| !l.is_empty()));
        let place = Place {
            city,
            country: body.country_name.filter(|c| !c.is_empty()),
        };
        (!place.is_unknown()).then_some(place)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn coordinate() -> Coordinate {
        Coordinate {
            latitude: 53.3501,
            longitude: -6.2661,
        }
    }

    #[tokio::test]
    async fn primary_result_is_used_when_available() {
        let primary = MockServer::start().await;
        let secondary = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "address": {"city": "Dublin", "country": "Ireland"}
            })))
            .mount(&primary)
            .await;

        let geocoder = Geocoder::with_base_urls(primary.uri(), secondary.uri());
        let place = geocoder.reverse(coordinate()).await;

        assert_eq!(place.city.as_deref(), Some("Dublin"));
        assert_eq!(place.country.as_deref(), Some("Ireland"));
        assert!(secondary.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn town_stands_in_for_city() {
        let primary = MockServer::start().await;
        let secondary = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "address": {"town": "Malahide", "country": "Ireland"}
            })))
            .mount(&primary)
            .await;

        let geocoder = Geocoder::with_base_urls(primary.uri(), secondary.uri());
        let place = geocoder.reverse(coordinate()).await;
        assert_eq!(place.city.as_deref(), Some("Malahide"));
    }

    #[tokio::test]
    async fn secondary_is_tried_when_primary_fails() {
        let primary = MockServer::start().await;
        let secondary = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&primary)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/reverse-geocode-client"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "city": "Dublin", "countryName": "Ireland"
            })))
            .mount(&secondary)
            .await;

        let geocoder = Geocoder::with_base_urls(primary.uri(), secondary.uri());
        let place = geocoder.reverse(coordinate()).await;

        assert_eq!(place.city.as_deref(), Some("Dublin"));
        assert_eq!(place.country.as_deref(), Some("Ireland"));
    }

    #[tokio::test]
    async fn secondary_is_tried_when_primary_is_empty() {
        let primary = MockServer::start().await;
        let secondary = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"address": {}})))
            .mount(&primary)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/reverse-geocode-client"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "locality": "Howth", "countryName": "Ireland"
            })))
            .mount(&secondary)
            .await;

        let geocoder = Geocoder::with_base_urls(primary.uri(), secondary.uri());
        let place = geocoder.reverse(coordinate()).await;
        assert_eq!(place.city.as_deref(), Some("Howth"));
    }

    #[tokio::test]
    async fn both_stages_failing_yields_unknown_place() {
        let primary = MockServer::start().await;
        let secondary = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&primary)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&secondary)
            .await;

        let geocoder = Geocoder::with_base_urls(primary.uri(), secondary.uri());
        let place = geocoder.reverse(coordinate()).await;
        assert!(place.is_unknown());
    }
}
