//! Messenger event handler
//!
//! Classifies each inbound messaging event and drives the session store
//! and the NLU dispatcher. Every terminal outcome acknowledges the event;
//! failures are logged and never escalate past the webhook boundary.

use std::sync::Arc;
use tracing::{debug, error, info};

use wx_core::{InMemorySessionStore, MessageSender, ProfileLookup};
use wx_nlu::ActionDispatcher;

use crate::api::{MessagingEvent, WebhookEntry};
use crate::error::Result;

/// Fixed reply for attachment-only messages
const ATTACHMENT_REPLY: &str = "That is a very nice attachment. ^^";

/// Messenger message handler
pub struct MessageHandler {
    sender: Arc<dyn MessageSender>,
    profiles: Arc<dyn ProfileLookup>,
    sessions: InMemorySessionStore,
    dispatcher: Arc<ActionDispatcher>,
}

impl MessageHandler {
    /// Create a new handler
    pub fn new(
        sender: Arc<dyn MessageSender>,
        profiles: Arc<dyn ProfileLookup>,
        sessions: InMemorySessionStore,
        dispatcher: Arc<ActionDispatcher>,
    ) -> Self {
        Self {
            sender,
            profiles,
            sessions,
            dispatcher,
        }
    }

    /// Handle every messaging event in a webhook entry
    pub async fn handle_webhook_entry(&self, entry: &WebhookEntry) {
        if let Some(events) = &entry.messaging {
            for event in events {
                if let Err(e) = self.handle_messaging(event).await {
                    error!("Error handling messaging event: {}", e);
                }
            }
        }
    }

    /// Handle a single messaging event
    async fn handle_messaging(&self, event: &MessagingEvent) -> Result<()> {
        let Some(message) = &event.message else {
            debug!("Ignoring non-message event");
            return Ok(());
        };

        let Some(sender_id) = event.sender.as_ref().map(|s| s.id.as_str()) else {
            debug!("No sender id in event");
            return Ok(());
        };

        if message.is_echo {
            debug!(
                "Received echo for message {:?} and app {:?} with metadata {:?}",
                message.mid, message.app_id, message.metadata
            );
            return Ok(());
        }

        if let Some(quick_reply) = &message.quick_reply {
            info!(
                "Quick reply for message {:?} with payload {}",
                message.mid, quick_reply.payload
            );
            return Ok(());
        }

        // First contact: open a session, greet, and drop the triggering
        // message without dispatching it.
        if self.sessions.find_by_user(sender_id).await.is_none() {
            self.greet_new_user(sender_id).await;
            return Ok(());
        }

        if let Some(text) = &message.text {
            self.dispatch_text(sender_id, text).await;
        } else if message.attachments.as_ref().is_some_and(|a| !a.is_empty()) {
            if let Err(e) = self.sender.send_text(sender_id, ATTACHMENT_REPLY).await {
                error!("Failed to acknowledge attachment: {}", e);
            }
        }

        Ok(())
    }

    /// Open a session for a first-time sender and send the greeting.
    ///
    /// The greeting is skipped (log only) when the profile fetch fails;
    /// the session still exists, so the user's next message dispatches.
    async fn greet_new_user(&self, sender_id: &str) {
        let session = self.sessions.find_or_create(sender_id).await;
        info!("New session {} for user {}", session.id, sender_id);

        match self.profiles.fetch_profile(sender_id).await {
            Ok(profile) => {
                let greeting = format!(
                    "Bonjour {} ! Je suis un bot météo. Demandez-moi la météo d'une ville.",
                    profile.display_name()
                );
                self.sessions.set_profile(&session.id, profile).await;

                if let Err(e) = self.sender.send_text(sender_id, &greeting).await {
                    error!("Failed to send greeting to {}: {}", sender_id, e);
                }
            }
            Err(e) => {
                error!("Failed calling User Profile API for {}: {}", sender_id, e);
            }
        }
    }

    /// Run a dispatch cycle for a user message and persist the outcome
    async fn dispatch_text(&self, sender_id: &str, text: &str) {
        let session = self.sessions.find_or_create(sender_id).await;

        match self
            .dispatcher
            .dispatch(&session.id, text, session.context)
            .await
        {
            Ok(context) => {
                debug!("Waiting for next user messages");
                if context.done {
                    self.sessions.delete(&session.id).await;
                } else {
                    self.sessions.set_context(&session.id, context).await;
                }
            }
            Err(e) => {
                error!("Dispatch failed for session {}: {}", session.id, e);
            }
        }
    }

    /// Session store shared with the webhook server
    pub fn sessions(&self) -> &InMemorySessionStore {
        &self.sessions
    }
}
