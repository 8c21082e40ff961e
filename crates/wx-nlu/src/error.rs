//! Error types for wx-nlu

use thiserror::Error;

/// wx-nlu error type
#[derive(Error, Debug)]
pub enum NluError {
    #[error("NLU engine error: {0}")]
    Api(String),

    #[error("NLU engine request failed: {0}")]
    Request(String),

    #[error("Invalid converse response: {0}")]
    InvalidResponse(String),

    #[error("Weather lookup failed: {0}")]
    Weather(#[from] wx_weather::WeatherError),
}

impl From<reqwest::Error> for NluError {
    fn from(err: reqwest::Error) -> Self {
        NluError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for NluError {
    fn from(err: serde_json::Error) -> Self {
        NluError::InvalidResponse(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, NluError>;
