//! wx-auth: OAuth2 login relay for the campus intranet API
//!
//! Serves a landing page, redirects to the provider's authorization
//! endpoint, and exchanges the returned authorization code for a token.

pub mod client;
pub mod error;
pub mod server;

pub use client::{IntraOauthClient, TokenResponse};
pub use error::{AuthError, Result};
pub use server::{create_auth_router, start_auth_server, AuthRelayState};
