//! Session and conversation state types

use serde::{Deserialize, Serialize};

use crate::outbound::UserProfile;

/// A single conversation session
///
/// One session exists per distinct platform user. Sessions are created on
/// first contact and deleted when the conversation state signals
/// completion.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque session id (time-ordered uuid)
    pub id: String,
    /// Platform user id this session belongs to
    pub user_id: String,
    /// Public profile fetched on first contact
    pub profile: Option<UserProfile>,
    /// Dialogue state owned by the NLU engine
    pub context: ConversationState,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Session {
    /// Create a fresh session for a user with an empty context
    pub fn new(user_id: &str) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            profile: None,
            context: ConversationState::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Dialogue state carried across dispatch cycles.
///
/// The known keys are explicit optional fields; anything else the engine
/// returns lands in `extra` unchanged, so an unexpected key never fails
/// deserialization. Absent means unset. Serialized camelCase to match the
/// engine's wire format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    /// Last rendered forecast, e.g. "clear skies in Paris"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<String>,

    /// Set when the user asked for a forecast without naming a location
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub missing_location: bool,

    /// Set by the engine when the conversation is over
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub done: bool,

    /// Engine-owned keys we do not interpret
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
