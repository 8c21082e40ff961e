//! OAuth2 authorization-code client for the intranet provider

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{AuthError, Result};

/// Scopes requested from the provider
const OAUTH_SCOPE: &str = "public projects";

/// OAuth2 client for the campus intranet API
#[derive(Clone)]
pub struct IntraOauthClient {
    client: Client,
    client_id: String,
    client_secret: String,
    host: String,
    redirect_uri: String,
}

impl IntraOauthClient {
    /// Create a new OAuth client.
    ///
    /// `server_url` is this deployment's public base URL; the provider
    /// redirects back to `{server_url}/auth42`.
    pub fn new(client_id: &str, client_secret: &str, host: &str, server_url: &str) -> Self {
        Self {
            client: Client::new(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            host: host.trim_end_matches('/').to_string(),
            redirect_uri: format!("{}/auth42", server_url.trim_end_matches('/')),
        }
    }

    /// Build the provider authorization URL users are redirected to
    pub fn authorize_url(&self) -> Result<String> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/oauth/authorize", self.host),
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", OAUTH_SCOPE),
                ("state", ""),
            ],
        )
        .map_err(|e| AuthError::Config(format!("Invalid authorization host: {}", e)))?;

        Ok(url.to_string())
    }

    /// Exchange an authorization code for a token
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let url = format!("{}/oauth/token", self.host);

        debug!("Exchanging authorization code at {}", url);

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Access Token Error: {} - {}", status, body);
            return Err(AuthError::TokenEndpoint(format!("{} - {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        debug!("Obtained token with scope {:?}", token.scope);

        Ok(token)
    }
}

/// Token returned by the provider's token endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub created_at: Option<i64>,
}
