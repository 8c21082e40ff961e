//! OpenWeatherMap city-search API client

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::{Result, WeatherError};

/// OpenWeatherMap API base URL
const OPENWEATHER_API_URL: &str = "http://api.openweathermap.org/data/2.5";

/// Looks up current conditions for a free-text location
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn find_city(&self, location: &str) -> Result<CitySearch>;
}

/// OpenWeatherMap API client
#[derive(Clone)]
pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherClient {
    /// Create a new weather client
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: OPENWEATHER_API_URL.to_string(),
        }
    }

    /// Create with a custom base URL (for testing or custom endpoints)
    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    /// Search for cities matching a free-text location
    async fn find_city(&self, location: &str) -> Result<CitySearch> {
        let url = format!("{}/find", self.base_url);

        debug!("Looking up weather for {:?}", location);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", location),
                ("type", "like"),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Weather API error: {} - {}", status, body);
            return Err(WeatherError::Api(format!("{} - {}", status, body)));
        }

        let search: CitySearch = response.json().await?;
        debug!("Weather API returned {} match(es)", search.list.len());

        Ok(search)
    }
}

// =============================================================================
// Data structures for the city-search response
// =============================================================================

/// Result of a `/find` city search
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CitySearch {
    #[serde(default)]
    pub list: Vec<CityConditions>,
}

impl CitySearch {
    /// First listed description (lowercased) and city name, when present
    pub fn first_description(&self) -> Option<(String, String)> {
        let city = self.list.first()?;
        let condition = city.weather.first()?;
        Some((condition.description.to_lowercase(), city.name.clone()))
    }
}

/// Current conditions for one matched city
#[derive(Debug, Clone, Deserialize)]
pub struct CityConditions {
    pub name: String,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
}

/// A single weather condition entry
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherCondition {
    pub description: String,
}
