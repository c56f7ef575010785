//! Nominatim client for nearby point-of-interest searches

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::{Coordinates, PointOfInterest};

/// Nominatim API response
#[derive(Debug, Deserialize)]
pub struct NominatimResult {
    pub lat: String,
    pub lon: String,
    pub display_name: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl NominatimResult {
    fn into_poi(self) -> Result<PointOfInterest> {
        let lat: f64 = self.lat.parse().context("Invalid latitude")?;
        let lng: f64 = self.lon.parse().context("Invalid longitude")?;
        let name = match self.name {
            Some(name) if !name.is_empty() => name,
            _ => self
                .display_name
                .split(',')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string(),
        };
        Ok(PointOfInterest {
            name,
            address: self.display_name,
            coordinates: Coordinates { lat, lng },
        })
    }
}

/// Nominatim search client
pub struct NominatimClient {
    base_url: String,
    client: reqwest::Client,
}

impl NominatimClient {
    /// Create a new client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("route-engine/0.2 (fuel-stop search)")
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn search_url(&self, point: Coordinates, radius_meters: f64, category: &str) -> String {
        let (left, top, right, bottom) = viewbox(point, radius_meters);
        format!(
            "{}/search?q={}&format=json&limit=5&bounded=1&viewbox={:.5},{:.5},{:.5},{:.5}",
            self.base_url,
            urlencoding::encode(category),
            left,
            top,
            right,
            bottom
        )
    }

    /// Search for `category` inside a box of `radius_meters` around `point`
    pub async fn search_nearby(
        &self,
        point: Coordinates,
        radius_meters: f64,
        category: &str,
    ) -> Result<Vec<PointOfInterest>> {
        let url = self.search_url(point, radius_meters, category);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send POI search request")?;

        if !response.status().is_success() {
            anyhow::bail!("Nominatim search returned status {}", response.status());
        }

        let results: Vec<NominatimResult> = response
            .json()
            .await
            .context("Failed to parse POI search response")?;

        results.into_iter().map(NominatimResult::into_poi).collect()
    }
}

/// Bounding box (left, top, right, bottom) around a point
fn viewbox(point: Coordinates, radius_meters: f64) -> (f64, f64, f64, f64) {
    let d_lat = radius_meters / 111_320.0;
    let d_lng = radius_meters / (111_320.0 * point.lat.to_radians().cos().max(0.01));
    (point.lng - d_lng, point.lat + d_lat, point.lng + d_lng, point.lat - d_lat)
}
