//! wx-facebook: Facebook Messenger gateway for wx-gateway
//!
//! Receives Messenger webhook events, routes them through the NLU action
//! dispatcher and sends replies via the Graph API.

pub mod api;
pub mod error;
pub mod handler;
pub mod webhook;

pub use api::{parse_webhook, GraphApi};
pub use error::{FacebookError, Result};
pub use handler::MessageHandler;
pub use webhook::{create_webhook_router, start_webhook_server, WebhookState};
