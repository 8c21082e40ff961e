//! Error types for wx-weather

use thiserror::Error;

/// wx-weather error type
#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Weather API error: {0}")]
    Api(String),

    #[error("Weather API request failed: {0}")]
    Request(String),

    #[error("Invalid weather response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        WeatherError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(err: serde_json::Error) -> Self {
        WeatherError::InvalidResponse(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WeatherError>;
