//! Address geocoding and great-circle helpers.
//!
//! The [`Geocoder`] trait is the seam services depend on; [`MapQuestGeocoder`] is the
//! HTTP adapter used in production.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::config::GeocoderConfig;
use crate::errors::AppError;

/// Mean Earth radius used for radius searches.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// A resolved address.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state_code: Option<String>,
    pub zipcode: Option<String>,
    pub country_code: Option<String>,
}

/// Resolves free-form addresses and postal codes to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve `query`. `Ok(None)` means the provider found nothing.
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedPlace>, AppError>;
}

/// Geocoder backed by the MapQuest address endpoint.
pub struct MapQuestGeocoder {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl MapQuestGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self, AppError> {
        let endpoint = Url::parse(&config.url).map_err(|e| {
            AppError::Internal(format!("Invalid geocoder URL {:?}: {}", config.url, e))
        })?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedPlace>, AppError> {
        let mut request = self
            .client
            .get(self.endpoint.clone())
            .query(&[("location", query), ("maxResults", "1")]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Geocoder returned {} for {:?}", status, query);
            return Err(AppError::Internal(format!(
                "Geocoder responded with status {}",
                status
            )));
        }

        let body: MapQuestResponse = response.json().await?;
        Ok(body.into_place())
    }
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: MapQuestLatLng,
    #[serde(default)]
    street: String,
    #[serde(default)]
    admin_area5: String,
    #[serde(default)]
    admin_area3: String,
    #[serde(default)]
    admin_area1: String,
    #[serde(default)]
    postal_code: String,
}

#[derive(Debug, Deserialize)]
struct MapQuestLatLng {
    lat: f64,
    lng: f64,
}

impl MapQuestResponse {
    fn into_place(self) -> Option<GeocodedPlace> {
        let location = self.results.into_iter().next()?.locations.into_iter().next()?;

        let formatted_address = [
            location.street.as_str(),
            location.admin_area5.as_str(),
            format!("{} {}", location.admin_area3, location.postal_code).trim(),
            location.admin_area1.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ");

        Some(GeocodedPlace {
            latitude: location.lat_lng.lat,
            longitude: location.lat_lng.lng,
            formatted_address,
            street: non_empty(location.street),
            city: non_empty(location.admin_area5),
            state_code: non_empty(location.admin_area3),
            zipcode: non_empty(location.postal_code),
            country_code: non_empty(location.admin_area1),
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

/// Convert a distance in miles into an angular radius in radians.
pub fn radius_radians(miles: f64) -> f64 {
    miles / EARTH_RADIUS_MILES
}

/// Central angle in radians between two points given in degrees (haversine).
pub fn central_angle(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * a.sqrt().min(1.0).asin()
}

/// Latitude range, in degrees, that can contain points within `radians` of `latitude`.
///
/// Used to pre-filter candidates in SQL before the exact distance check.
pub fn latitude_band(latitude: f64, radians: f64) -> (f64, f64) {
    let delta = radians.to_degrees();
    ((latitude - delta).max(-90.0), (latitude + delta).min(90.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_radians() {
        assert!((radius_radians(3958.8) - 1.0).abs() < 1e-12);
        assert_eq!(radius_radians(0.0), 0.0);
    }

    #[test]
    fn test_central_angle_known_distance() {
        // Mountain View to Cupertino is roughly 6.5 miles
        let angle = central_angle(37.4220, -122.0841, 37.3318, -122.0312);
        let miles = angle * EARTH_RADIUS_MILES;
        assert!(miles > 6.0 && miles < 7.5, "got {miles}");

        assert_eq!(central_angle(10.0, 20.0, 10.0, 20.0), 0.0);
    }

    #[test]
    fn test_latitude_band_clamps() {
        let (low, high) = latitude_band(89.0, radius_radians(500.0));
        assert!(low < 89.0);
        assert_eq!(high, 90.0);
    }

    #[test]
    fn test_parse_mapquest_response() {
        let body: MapQuestResponse = serde_json::from_value(serde_json::json!({
            "results": [{
                "locations": [{
                    "street": "233 Bay State Rd",
                    "adminArea5": "Boston",
                    "adminArea3": "MA",
                    "adminArea1": "US",
                    "postalCode": "02215",
                    "latLng": { "lat": 42.350009, "lng": -71.103279 }
                }]
            }]
        }))
        .unwrap();

        let place = body.into_place().unwrap();
        assert_eq!(place.city.as_deref(), Some("Boston"));
        assert_eq!(place.state_code.as_deref(), Some("MA"));
        assert_eq!(place.zipcode.as_deref(), Some("02215"));
        assert_eq!(place.formatted_address, "233 Bay State Rd, Boston, MA 02215, US");
        assert_eq!(place.longitude, -71.103279);
    }

    #[test]
    fn test_empty_response_is_none() {
        let body: MapQuestResponse =
            serde_json::from_value(serde_json::json!({ "results": [{ "locations": [] }] }))
                .unwrap();
        assert!(body.into_place().is_none());
    }
}
