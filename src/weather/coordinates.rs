//! Region -> coordinates resolution, split out from the daily-weather
//! client (SPEC_FULL §4.3 ADDED) so both can be mocked independently.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{CellarError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[async_trait]
pub trait RegionCoordinateResolver: Send + Sync {
    async fn resolve(&self, region: &str) -> Result<Option<Coordinates>>;
}

/// A small built-in table of well-known wine regions, consulted before
/// falling back to the geocoding API, so common regions resolve without a
/// network round trip.
fn known_region_coordinates(region: &str) -> Option<Coordinates> {
    let table: &[(&str, Coordinates)] = &[
        ("bordeaux", Coordinates { latitude: 44.84, longitude: -0.58 }),
        ("burgundy", Coordinates { latitude: 47.05, longitude: 4.38 }),
        ("napa", Coordinates { latitude: 38.50, longitude: -122.27 }),
        ("champagne", Coordinates { latitude: 49.04, longitude: 3.96 }),
        ("tuscany", Coordinates { latitude: 43.45, longitude: 11.10 }),
        ("piedmont", Coordinates { latitude: 44.70, longitude: 8.03 }),
        ("rhone", Coordinates { latitude: 44.93, longitude: 4.83 }),
    ];
    table
        .iter()
        .find(|(name, _)| *name == region)
        .map(|(_, c)| *c)
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    latitude: f64,
    longitude: f64,
}

pub struct OpenMeteoCoordinateResolver {
    client: reqwest::Client,
    geocoding_url: String,
}

impl OpenMeteoCoordinateResolver {
    pub fn new(client: reqwest::Client, geocoding_url: impl Into<String>) -> Self {
        Self {
            client,
            geocoding_url: geocoding_url.into(),
        }
    }
}

#[async_trait]
impl RegionCoordinateResolver for OpenMeteoCoordinateResolver {
    async fn resolve(&self, region: &str) -> Result<Option<Coordinates>> {
        if let Some(coords) = known_region_coordinates(&region.to_lowercase()) {
            return Ok(Some(coords));
        }

        let response = self
            .client
            .get(&self.geocoding_url)
            .query(&[("name", region), ("count", "1")])
            .send()
            .await
            .map_err(|e| CellarError::ServiceUnavailable(format!("geocoding request failed: {e}")))?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let body: GeocodingResponse = response
            .json()
            .await
            .map_err(|e| CellarError::ServiceUnavailable(format!("geocoding decode failed: {e}")))?;

        Ok(body
            .results
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .map(|r| Coordinates {
                latitude: r.latitude,
                longitude: r.longitude,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_regions_without_network() {
        assert!(known_region_coordinates("bordeaux").is_some());
        assert!(known_region_coordinates("narnia").is_none());
    }
}
