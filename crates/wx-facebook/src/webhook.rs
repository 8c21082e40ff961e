//! Webhook server for the Messenger platform
//!
//! `GET /webhook` answers the subscription verification handshake;
//! `POST /webhook` receives event deliveries. The platform contract
//! requires a 200 acknowledgement for every delivery, so the POST handler
//! never surfaces processing failures as HTTP errors.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::api::{parse_webhook, GraphApi};
use crate::error::{FacebookError, Result};
use crate::handler::MessageHandler;

/// Webhook server state
#[derive(Clone)]
pub struct WebhookState {
    pub api: GraphApi,
    pub handler: Arc<MessageHandler>,
}

/// Subscription verification query parameters
#[derive(Debug, Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// Create the webhook router
pub fn create_webhook_router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", get(handle_verification).post(handle_delivery))
        .with_state(Arc::new(state))
}

/// Handle the subscription verification handshake
async fn handle_verification(
    State(state): State<Arc<WebhookState>>,
    Query(params): Query<VerifyParams>,
) -> (StatusCode, String) {
    let mode = params.mode.as_deref().unwrap_or_default();
    let token = params.verify_token.as_deref().unwrap_or_default();
    let challenge = params.challenge.unwrap_or_default();

    match state.api.verify_webhook(mode, token, &challenge) {
        Ok(challenge) => (StatusCode::OK, challenge),
        Err(_) => (StatusCode::FORBIDDEN, String::new()),
    }
}

/// Handle an event delivery.
///
/// Always acknowledges with 200, even for bodies we cannot parse.
async fn handle_delivery(State(state): State<Arc<WebhookState>>, body: String) -> StatusCode {
    match parse_webhook(&body) {
        Ok(entries) => {
            for entry in &entries {
                state.handler.handle_webhook_entry(entry).await;
            }
        }
        Err(e) => {
            warn!("Discarding undeliverable webhook body: {}", e);
        }
    }

    StatusCode::OK
}

/// Start the webhook server
pub async fn start_webhook_server(state: WebhookState, host: &str, port: u16) -> Result<()> {
    let app = create_webhook_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| FacebookError::Server(e.to_string()))?;

    info!("Messenger webhook server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| FacebookError::Server(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use wx_core::{
        ConversationState, InMemorySessionStore, MessageSender, ProfileLookup,
        Result as CoreResult, UserProfile,
    };
    use wx_nlu::{ActionDispatcher, ConverseStep, NluEngine};
    use wx_weather::{CitySearch, WeatherProvider};

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl MessageSender for RecordingSender {
        async fn send_text(&self, recipient_id: &str, text: &str) -> CoreResult<()> {
            self.sent
                .lock()
                .unwrap()
                .push((recipient_id.to_string(), text.to_string()));
            Ok(())
        }
    }

    struct StubProfiles;

    #[async_trait]
    impl ProfileLookup for StubProfiles {
        async fn fetch_profile(&self, _user_id: &str) -> CoreResult<UserProfile> {
            Ok(UserProfile::default())
        }
    }

    struct StoppingEngine;

    #[async_trait]
    impl NluEngine for StoppingEngine {
        async fn converse(
            &self,
            _session_id: &str,
            _message: Option<&str>,
            _context: &ConversationState,
        ) -> wx_nlu::Result<ConverseStep> {
            Ok(serde_json::from_str(r#"{"type": "stop"}"#).unwrap())
        }
    }

    struct NoWeather;

    #[async_trait]
    impl WeatherProvider for NoWeather {
        async fn find_city(&self, _location: &str) -> wx_weather::Result<CitySearch> {
            Ok(CitySearch::default())
        }
    }

    fn test_state() -> (WebhookState, Arc<RecordingSender>, InMemorySessionStore) {
        let sender = Arc::new(RecordingSender::default());
        let sessions = InMemorySessionStore::new();

        let dispatcher = Arc::new(ActionDispatcher::new(
            Arc::new(StoppingEngine),
            Arc::new(NoWeather),
            Arc::clone(&sender) as Arc<dyn MessageSender>,
            sessions.clone(),
        ));
        let handler = Arc::new(MessageHandler::new(
            Arc::clone(&sender) as Arc<dyn MessageSender>,
            Arc::new(StubProfiles),
            sessions.clone(),
            dispatcher,
        ));

        let state = WebhookState {
            api: GraphApi::new("page-token", "verify-me"),
            handler,
        };
        (state, sender, sessions)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_verification_echoes_the_challenge() {
        let (state, _, _) = test_state();
        let app = create_webhook_router(state);

        let uri = "/webhook?hub.mode=subscribe&hub.verify_token=verify-me&hub.challenge=1158201444";
        let response = app.oneshot(get_request(uri)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"1158201444");
    }

    #[tokio::test]
    async fn test_verification_rejects_a_bad_token() {
        let (state, _, _) = test_state();
        let app = create_webhook_router(state);

        let uri = "/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=x";
        let response = app.oneshot(get_request(uri)).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_delivery_acknowledges_empty_and_malformed_bodies() {
        let (state, _, _) = test_state();

        let app = create_webhook_router(state.clone());
        let response = app.oneshot(post_request("")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let app = create_webhook_router(state);
        let response = app.oneshot(post_request("{\"entry\": 42}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_delivery_processes_events_and_acknowledges() {
        let (state, sender, sessions) = test_state();
        let app = create_webhook_router(state);

        let body = r#"{
            "object": "page",
            "entry": [{
                "id": "1",
                "messaging": [{
                    "sender": {"id": "user-1"},
                    "recipient": {"id": "page-1"},
                    "message": {"mid": "m1", "text": "hello"}
                }]
            }]
        }"#;

        let response = app.oneshot(post_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        // First contact: a session and exactly one greeting.
        assert_eq!(sessions.len().await, 1);
        assert_eq!(sender.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_echo_delivery_acknowledges_without_side_effects() {
        let (state, sender, sessions) = test_state();
        let app = create_webhook_router(state);

        let body = r#"{
            "object": "page",
            "entry": [{
                "id": "1",
                "messaging": [{
                    "sender": {"id": "page-1"},
                    "message": {"mid": "m1", "is_echo": true, "text": "echoed"}
                }]
            }]
        }"#;

        let response = app.oneshot(post_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(sender.sent.lock().unwrap().is_empty());
        assert!(sessions.is_empty().await);
    }
}
