pub mod models;

use crate::config::KeyFromEnv;
use crate::core::Geocoder;
use crate::error::GeocodeError;
use async_trait::async_trait;
use models::GeocodeResponse;
use reqwest::Client;
use tracing::{debug, error, info, instrument};

pub const DEFAULT_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Configuration for the Google geocoding client
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub api_key: String,
    pub endpoint: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_GEOCODE_URL.to_string(),
        }
    }
}

impl GeocoderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), ..Default::default() }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Clone, Debug)]
pub struct GoogleGeocoder {
    config: GeocoderConfig,
    client: Client,
}

impl KeyFromEnv for GoogleGeocoder {
    const KEY_NAME: &'static str = "GOOGLE_MAPS_API_KEY";
}

impl GoogleGeocoder {
    pub fn new(config: GeocoderConfig) -> Self {
        info!(endpoint = %config.endpoint, "Creating new geocoding client");
        Self { config, client: Client::new() }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    #[instrument(skip(self, address), fields(address_len = address.len()))]
    async fn geocode(&self, address: &str) -> Result<GeocodeResponse, GeocodeError> {
        debug!("Sending geocoding request");
        // The service reports lookup failures through `status`, not the HTTP code,
        // so the body is decoded whatever the response status is.
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[("address", address), ("key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                GeocodeError::Http(e.to_string())
            })?;

        debug!(status = %response.status(), "Received response from geocoding API");

        let body: GeocodeResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse geocoding response JSON");
            GeocodeError::Decode(e.to_string())
        })?;

        debug!(status = %body.status, results = body.results.len(), "Parsed geocoding response");
        Ok(body)
    }
}
