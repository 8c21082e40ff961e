//! Wit converse API client
//!
//! Speaks the step-based converse protocol: each call returns the next
//! engine step (`msg`, `action` or `stop`) for the session, given the
//! current conversation state.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use wx_core::ConversationState;

use crate::error::{NluError, Result};

/// Wit API base URL
const WIT_API_URL: &str = "https://api.wit.ai";

/// Converse API version
const WIT_API_VERSION: &str = "20160526";

/// NLU engine seam the dispatcher runs against
#[async_trait]
pub trait NluEngine: Send + Sync {
    /// Request the next converse step.
    ///
    /// `message` carries the user's text on the first call of a dispatch
    /// cycle and is absent on follow-up calls.
    async fn converse(
        &self,
        session_id: &str,
        message: Option<&str>,
        context: &ConversationState,
    ) -> Result<ConverseStep>;
}

/// Wit converse client
#[derive(Clone)]
pub struct WitClient {
    client: Client,
    token: String,
    base_url: String,
}

impl WitClient {
    /// Create a new Wit client
    pub fn new(token: &str) -> Self {
        Self {
            client: Client::new(),
            token: token.to_string(),
            base_url: WIT_API_URL.to_string(),
        }
    }

    /// Create with a custom base URL (for testing or custom endpoints)
    pub fn with_base_url(token: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            token: token.to_string(),
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl NluEngine for WitClient {
    async fn converse(
        &self,
        session_id: &str,
        message: Option<&str>,
        context: &ConversationState,
    ) -> Result<ConverseStep> {
        let url = format!("{}/converse", self.base_url);

        let mut query = vec![
            ("v", WIT_API_VERSION.to_string()),
            ("session_id", session_id.to_string()),
        ];
        if let Some(text) = message {
            query.push(("q", text.to_string()));
        }

        debug!("Converse step for session {}", session_id);

        let response = self
            .client
            .post(&url)
            .query(&query)
            .bearer_auth(&self.token)
            .json(context)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Converse API error: {} - {}", status, body);
            return Err(NluError::Api(format!("{} - {}", status, body)));
        }

        let step: ConverseStep = response.json().await?;
        debug!("Converse step: {:?}", step.step_type);

        Ok(step)
    }
}

// =============================================================================
// Converse protocol types
// =============================================================================

/// Entities extracted by the engine, keyed by entity name
pub type Entities = HashMap<String, Vec<Entity>>;

/// A single extracted entity value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// One step of a converse cycle
#[derive(Debug, Clone, Deserialize)]
pub struct ConverseStep {
    #[serde(rename = "type")]
    pub step_type: StepType,
    pub msg: Option<String>,
    pub action: Option<String>,
    #[serde(default)]
    pub entities: Entities,
    pub confidence: Option<f64>,
}

/// Converse step discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    /// The bot has something to say
    Msg,
    /// The engine wants a named action executed
    Action,
    /// The cycle is complete; wait for the next user message
    Stop,
    /// Anything this client does not interpret
    #[serde(other)]
    Unknown,
}

/// First value of the first entity with the given name.
///
/// Entity values are either scalars or objects carrying a nested `value`
/// field; both shapes are unwrapped.
pub fn first_entity_value(entities: &Entities, name: &str) -> Option<String> {
    let value = entities.get(name)?.first()?.value.as_ref()?;
    match value {
        serde_json::Value::Object(map) => scalar_to_string(map.get("value")?),
        other => scalar_to_string(other),
    }
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities_from(json: &str) -> Entities {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_first_entity_value_scalar() {
        let entities = entities_from(r#"{"location": [{"confidence": 0.9, "value": "Paris"}]}"#);
        assert_eq!(
            first_entity_value(&entities, "location"),
            Some("Paris".to_string())
        );
    }

    #[test]
    fn test_first_entity_value_nested_object() {
        let entities = entities_from(
            r#"{"location": [{"value": {"value": "Lyon", "grain": "city"}}]}"#,
        );
        assert_eq!(
            first_entity_value(&entities, "location"),
            Some("Lyon".to_string())
        );
    }

    #[test]
    fn test_first_entity_value_takes_first() {
        let entities =
            entities_from(r#"{"location": [{"value": "Paris"}, {"value": "Lyon"}]}"#);
        assert_eq!(
            first_entity_value(&entities, "location"),
            Some("Paris".to_string())
        );
    }

    #[test]
    fn test_first_entity_value_absent() {
        let entities = entities_from(r#"{"intent": [{"value": "forecast"}]}"#);
        assert_eq!(first_entity_value(&entities, "location"), None);
        assert_eq!(first_entity_value(&entities_from("{}"), "location"), None);
    }

    #[test]
    fn test_converse_step_parsing() {
        let step: ConverseStep = serde_json::from_str(
            r#"{
                "type": "action",
                "action": "getForecast",
                "entities": {"location": [{"confidence": 0.95, "value": "Paris"}]},
                "confidence": 0.95
            }"#,
        )
        .unwrap();

        assert_eq!(step.step_type, StepType::Action);
        assert_eq!(step.action.as_deref(), Some("getForecast"));
        assert!(step.entities.contains_key("location"));
    }

    #[test]
    fn test_converse_step_unknown_type() {
        let step: ConverseStep = serde_json::from_str(r#"{"type": "merge"}"#).unwrap();
        assert_eq!(step.step_type, StepType::Unknown);
    }
}
