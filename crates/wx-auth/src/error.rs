//! Error types for wx-auth

use thiserror::Error;

/// wx-auth error type
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token endpoint error: {0}")]
    TokenEndpoint(String),

    #[error("Token request failed: {0}")]
    Request(String),

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Relay server error: {0}")]
    Server(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::InvalidResponse(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AuthError>;
