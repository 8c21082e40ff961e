//! OAuth relay HTTP service
//!
//! Three routes: a landing page with a login link, a redirect to the
//! provider's authorization endpoint, and the authorization-code callback
//! that performs the token exchange.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::client::IntraOauthClient;
use crate::error::{AuthError, Result};

/// Landing page body
const LANDING_HTML: &str =
    r#"Weather Bot Gateway<br><a href="/auth42_redirect">Log in with intra42</a>"#;

/// Relay server state
#[derive(Clone)]
pub struct AuthRelayState {
    pub oauth: IntraOauthClient,
}

/// Authorization-code callback query parameters
#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    #[allow(dead_code)]
    state: Option<String>,
}

/// Create the relay router
pub fn create_auth_router(state: AuthRelayState) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/auth42_redirect", get(authorize_redirect))
        .route("/auth42", get(callback))
        .with_state(Arc::new(state))
}

/// Landing page with the login link
async fn landing() -> Html<&'static str> {
    Html(LANDING_HTML)
}

/// Redirect to the provider's authorization endpoint
async fn authorize_redirect(State(state): State<Arc<AuthRelayState>>) -> Response {
    match state.oauth.authorize_url() {
        Ok(url) => Redirect::temporary(&url).into_response(),
        Err(e) => {
            error!("Cannot build authorization URL: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Relay misconfigured").into_response()
        }
    }
}

/// Authorization-code callback: exchange the code for a token.
///
/// Failures answer 200 with a plain failure string, mirroring what the
/// provider-facing login page expects.
async fn callback(
    State(state): State<Arc<AuthRelayState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    debug!("Callback query: {:?}", params);

    let Some(code) = params.code else {
        warn!("Callback without an authorization code");
        return Json("Authentication failed").into_response();
    };

    match state.oauth.exchange_code(&code).await {
        Ok(token) => (StatusCode::OK, Json(token)).into_response(),
        Err(e) => {
            error!("Access Token Error: {}", e);
            Json("Authentication failed").into_response()
        }
    }
}

/// Start the relay server
pub async fn start_auth_server(state: AuthRelayState, host: &str, port: u16) -> Result<()> {
    let app = create_auth_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AuthError::Server(e.to_string()))?;

    info!("OAuth relay listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AuthError::Server(e.to_string()))?;

    Ok(())
}
