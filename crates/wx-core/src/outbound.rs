//! Outbound messaging seams
//!
//! Platform crates implement these traits; the dispatcher and the event
//! handler only see the trait objects, so tests can swap in fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Delivers a text reply to a platform user
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, recipient_id: &str, text: &str) -> Result<()>;
}

/// Fetches a user's public profile from the platform
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile>;
}

/// Public profile fields returned by the platform profile API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_pic: Option<String>,
    pub locale: Option<String>,
    pub timezone: Option<f64>,
    pub gender: Option<String>,
}

impl UserProfile {
    /// Display name built from whatever name fields are present
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => "there".to_string(),
        }
    }
}
