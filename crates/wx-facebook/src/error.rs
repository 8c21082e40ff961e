//! Error types for wx-facebook

use thiserror::Error;

/// wx-facebook error type
#[derive(Error, Debug)]
pub enum FacebookError {
    #[error("Graph API error: {0}")]
    Api(String),

    #[error("Graph API request failed: {0}")]
    Request(String),

    #[error("Webhook verification failed")]
    WebhookVerificationFailed,

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("Webhook server error: {0}")]
    Server(String),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] wx_nlu::NluError),
}

impl From<reqwest::Error> for FacebookError {
    fn from(err: reqwest::Error) -> Self {
        FacebookError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for FacebookError {
    fn from(err: serde_json::Error) -> Self {
        FacebookError::InvalidPayload(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, FacebookError>;
