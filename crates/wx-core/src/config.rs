//! Configuration management
//!
//! Settings are resolved in the following order:
//! 1. Environment variables
//! 2. wx-gateway.toml config file
//! 3. Defaults
//!
//! Inside the config file, `${VAR_NAME}` expands to the environment
//! variable's value.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Public base URL of this deployment (used for OAuth redirect URIs)
    pub base_url: String,

    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Messenger webhook port
    #[serde(default = "default_webhook_port")]
    pub webhook_port: u16,

    /// OAuth relay port
    #[serde(default = "default_auth_port")]
    pub auth_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            host: default_host(),
            webhook_port: default_webhook_port(),
            auth_port: default_auth_port(),
        }
    }
}

/// Facebook Messenger configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacebookConfig {
    /// Page access token for the Send and Profile APIs
    pub page_access_token: String,

    /// Webhook subscription verify token
    pub verify_token: String,
}

/// NLU engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NluConfig {
    /// Engine access token
    pub token: String,

    /// Base URL (optional, for custom endpoints)
    pub base_url: Option<String>,
}

/// Weather API configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// API key
    pub api_key: String,

    /// Base URL (optional, for custom endpoints)
    pub base_url: Option<String>,
}

/// Campus intranet OAuth configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// OAuth client id
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// Authorization server host (scheme + authority)
    pub host: String,
}

/// Main configuration for wx-gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Facebook Messenger configuration
    #[serde(default)]
    pub facebook: FacebookConfig,

    /// NLU engine configuration
    #[serde(default)]
    pub nlu: NluConfig,

    /// Weather API configuration
    #[serde(default)]
    pub weather: WeatherConfig,

    /// OAuth relay configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_webhook_port() -> u16 {
    5000
}

fn default_auth_port() -> u16 {
    5001
}

impl Config {
    /// Expand `${VAR_NAME}` references to environment variable values.
    ///
    /// Unknown variables expand to the empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                while let Some(&c) = chars.peek() {
                    if c == '}' {
                        chars.next();
                        break;
                    }
                    var_name.push(chars.next().unwrap());
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file.
    ///
    /// `${VAR_NAME}` inside the file is replaced with the environment
    /// variable's value before parsing. Environment variables still win
    /// over file values afterwards.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let expanded_content = Self::expand_env_vars(&toml_content);

        let toml: TomlConfig = toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        let mut cfg = Self::from_toml_config(toml);
        cfg.apply_env_overrides();

        Ok(cfg)
    }

    /// Load configuration from the default location.
    ///
    /// Tries `./wx-gateway.toml` first, then falls back to environment
    /// variables only.
    pub fn load() -> Result<Self> {
        if Path::new("wx-gateway.toml").exists() {
            return Self::from_toml_file("wx-gateway.toml");
        }

        Self::from_env()
    }

    /// Build a Config from the parsed TOML mirror structure
    fn from_toml_config(toml: TomlConfig) -> Self {
        let server = toml.server.unwrap_or_default();
        let facebook = toml.facebook.unwrap_or_default();
        let nlu = toml.nlu.unwrap_or_default();
        let weather = toml.weather.unwrap_or_default();
        let auth = toml.auth.unwrap_or_default();

        Config {
            server: ServerConfig {
                base_url: server.base_url.unwrap_or_default(),
                host: server.host.unwrap_or_else(default_host),
                webhook_port: server.webhook_port.unwrap_or_else(default_webhook_port),
                auth_port: server.auth_port.unwrap_or_else(default_auth_port),
            },
            facebook: FacebookConfig {
                page_access_token: facebook.page_access_token.unwrap_or_default(),
                verify_token: facebook.verify_token.unwrap_or_default(),
            },
            nlu: NluConfig {
                token: nlu.token.unwrap_or_default(),
                base_url: nlu.base_url,
            },
            weather: WeatherConfig {
                api_key: weather.api_key.unwrap_or_default(),
                base_url: weather.base_url,
            },
            auth: AuthConfig {
                client_id: auth.client_id.unwrap_or_default(),
                client_secret: auth.client_secret.unwrap_or_default(),
                host: auth.host.unwrap_or_default(),
            },
        }
    }

    /// Override file values with environment variables
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SERVER_URL") {
            self.server.base_url = url;
        }
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse() {
                self.server.webhook_port = p;
            }
        }
        if let Ok(port) = std::env::var("AUTH_PORT") {
            if let Ok(p) = port.parse() {
                self.server.auth_port = p;
            }
        }

        if let Ok(token) = std::env::var("PAGE_ACCESS_TOKEN") {
            self.facebook.page_access_token = token;
        }
        if let Ok(token) = std::env::var("VERIFY_TOKEN") {
            self.facebook.verify_token = token;
        }

        if let Ok(token) = std::env::var("WIT_TOKEN") {
            self.nlu.token = token;
        }

        if let Ok(key) = std::env::var("WEATHER_API_KEY") {
            self.weather.api_key = key;
        }

        if let Ok(uid) = std::env::var("API42_UID") {
            self.auth.client_id = uid;
        }
        if let Ok(secret) = std::env::var("API42_SECRET") {
            self.auth.client_secret = secret;
        }
        if let Ok(host) = std::env::var("API42_HOST") {
            self.auth.host = host;
        }
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        let mut cfg = Config::default();
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Check that every required value is present.
    ///
    /// Returns an error naming all missing keys so the process can exit
    /// with a single diagnostic.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();

        if self.server.base_url.is_empty() {
            missing.push("server.base_url (SERVER_URL)");
        }
        if self.facebook.page_access_token.is_empty() {
            missing.push("facebook.page_access_token (PAGE_ACCESS_TOKEN)");
        }
        if self.facebook.verify_token.is_empty() {
            missing.push("facebook.verify_token (VERIFY_TOKEN)");
        }
        if self.nlu.token.is_empty() {
            missing.push("nlu.token (WIT_TOKEN)");
        }
        if self.weather.api_key.is_empty() {
            missing.push("weather.api_key (WEATHER_API_KEY)");
        }
        if self.auth.client_id.is_empty() {
            missing.push("auth.client_id (API42_UID)");
        }
        if self.auth.client_secret.is_empty() {
            missing.push("auth.client_secret (API42_SECRET)");
        }
        if self.auth.host.is_empty() {
            missing.push("auth.host (API42_HOST)");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "Missing config values: {}",
                missing.join(", ")
            )))
        }
    }
}

// ============================================================================
// TOML mirror structs (file parsing only)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    server: Option<TomlServerConfig>,
    facebook: Option<TomlFacebookConfig>,
    nlu: Option<TomlNluConfig>,
    weather: Option<TomlWeatherConfig>,
    auth: Option<TomlAuthConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlServerConfig {
    base_url: Option<String>,
    host: Option<String>,
    webhook_port: Option<u16>,
    auth_port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlFacebookConfig {
    page_access_token: Option<String>,
    verify_token: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlNluConfig {
    token: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlWeatherConfig {
    api_key: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlAuthConfig {
    client_id: Option<String>,
    client_secret: Option<String>,
    host: Option<String>,
}
