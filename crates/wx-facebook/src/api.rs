//! Facebook Messenger Graph API client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use wx_core::{MessageSender, ProfileLookup, UserProfile};

use crate::error::{FacebookError, Result};

/// Graph API base URL
const GRAPH_API_URL: &str = "https://graph.facebook.com/v2.6";

/// Opaque metadata attached to every outbound message
const MESSAGE_METADATA: &str = "DEVELOPER_DEFINED_METADATA";

/// Profile fields requested on first contact
const PROFILE_FIELDS: &str = "first_name,last_name,profile_pic,locale,timezone,gender";

/// Graph API client
#[derive(Clone)]
pub struct GraphApi {
    client: Client,
    access_token: String,
    verify_token: String,
    base_url: String,
}

impl GraphApi {
    /// Create a new Graph API client
    pub fn new(access_token: &str, verify_token: &str) -> Self {
        Self {
            client: Client::new(),
            access_token: access_token.to_string(),
            verify_token: verify_token.to_string(),
            base_url: GRAPH_API_URL.to_string(),
        }
    }

    /// Create with a custom base URL (for testing or custom endpoints)
    pub fn with_base_url(access_token: &str, verify_token: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            access_token: access_token.to_string(),
            verify_token: verify_token.to_string(),
            base_url: base_url.to_string(),
        }
    }

    /// Send a text message via the Send API
    pub async fn send_message(&self, recipient_id: &str, text: &str) -> Result<SendResponse> {
        let url = format!("{}/me/messages", self.base_url);

        let payload = SendPayload {
            recipient: Recipient {
                id: recipient_id.to_string(),
            },
            message: OutboundMessage {
                text: text.to_string(),
                metadata: MESSAGE_METADATA.to_string(),
            },
        };

        debug!("Sending message to {}: {}", recipient_id, text);

        let response = self
            .client
            .post(&url)
            .query(&[("access_token", &self.access_token)])
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Failed calling Send API: {} - {}", status, body);
            return Err(FacebookError::Api(format!("{} - {}", status, body)));
        }

        let send_response: SendResponse = response.json().await?;
        info!(
            "Successfully sent message {:?} to recipient {:?}",
            send_response.message_id, send_response.recipient_id
        );

        Ok(send_response)
    }

    /// Fetch a user's public profile
    pub async fn user_profile(&self, user_id: &str) -> Result<UserProfile> {
        let url = format!("{}/{}", self.base_url, user_id);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("fields", PROFILE_FIELDS),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Failed calling User Profile API: {} - {}", status, body);
            return Err(FacebookError::Api(format!("{} - {}", status, body)));
        }

        let profile: UserProfile = response.json().await?;
        debug!("Got user profile: {:?}", profile);

        Ok(profile)
    }

    /// Verify a webhook subscription challenge
    pub fn verify_webhook(&self, mode: &str, token: &str, challenge: &str) -> Result<String> {
        if mode == "subscribe" && token == self.verify_token {
            info!("Validating webhook");
            Ok(challenge.to_string())
        } else {
            error!("Failed validation. Make sure the validation tokens match.");
            Err(FacebookError::WebhookVerificationFailed)
        }
    }

}

/// Parse a webhook delivery body into its entries
pub fn parse_webhook(payload: &str) -> Result<Vec<WebhookEntry>> {
    let webhook: WebhookPayload =
        serde_json::from_str(payload).map_err(|e| FacebookError::InvalidPayload(e.to_string()))?;

    Ok(webhook.entry.unwrap_or_default())
}

#[async_trait]
impl MessageSender for GraphApi {
    async fn send_text(&self, recipient_id: &str, text: &str) -> wx_core::Result<()> {
        self.send_message(recipient_id, text)
            .await
            .map(|_| ())
            .map_err(|e| wx_core::Error::Api(e.to_string()))
    }
}

#[async_trait]
impl ProfileLookup for GraphApi {
    async fn fetch_profile(&self, user_id: &str) -> wx_core::Result<UserProfile> {
        self.user_profile(user_id)
            .await
            .map_err(|e| wx_core::Error::Api(e.to_string()))
    }
}

// =============================================================================
// Data structures for the Messenger platform
// =============================================================================

#[derive(Debug, Serialize)]
struct SendPayload {
    recipient: Recipient,
    message: OutboundMessage,
}

#[derive(Debug, Serialize)]
struct Recipient {
    id: String,
}

#[derive(Debug, Serialize)]
struct OutboundMessage {
    text: String,
    metadata: String,
}

#[derive(Debug, Deserialize)]
pub struct SendResponse {
    pub recipient_id: Option<String>,
    pub message_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub object: Option<String>,
    pub entry: Option<Vec<WebhookEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    pub id: Option<String>,
    pub time: Option<i64>,
    pub messaging: Option<Vec<MessagingEvent>>,
}

/// One messaging event delivered to the webhook
#[derive(Debug, Deserialize)]
pub struct MessagingEvent {
    pub sender: Option<EventParty>,
    pub recipient: Option<EventParty>,
    pub timestamp: Option<i64>,
    pub message: Option<InboundMessage>,
    pub postback: Option<Postback>,
}

#[derive(Debug, Deserialize)]
pub struct EventParty {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub mid: Option<String>,
    pub app_id: Option<i64>,
    pub metadata: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub is_echo: bool,
    pub quick_reply: Option<QuickReply>,
    pub attachments: Option<Vec<Attachment>>,
}

#[derive(Debug, Deserialize)]
pub struct QuickReply {
    pub payload: String,
}

#[derive(Debug, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Postback {
    pub payload: Option<String>,
}
