//! wx-gateway: Messenger weather bot + intranet OAuth relay
//!
//! Main entry point. Runs two HTTP services:
//!   - the Messenger webhook server (subscription verification + events)
//!   - the intra42 OAuth login relay
//!
//! Usage:
//!   wx-gateway           - Start both services
//!   wx-gateway --help    - Show help
//!   wx-gateway --version - Show version

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use wx_auth::{AuthRelayState, IntraOauthClient};
use wx_core::{Config, InMemorySessionStore};
use wx_facebook::{GraphApi, MessageHandler, WebhookState};
use wx_nlu::{ActionDispatcher, WitClient};
use wx_weather::OpenWeatherClient;

/// Run mode
enum RunMode {
    /// Serve the webhook and the OAuth relay
    Server,
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match parse_args() {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("wx-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration; a missing required value is fatal
    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    tracing::info!("Starting wx-gateway...");

    run_server(config).await
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    let args: Vec<String> = std::env::args().collect();

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

/// Print help message
fn print_help() {
    println!("wx-gateway - Messenger weather bot + intranet OAuth relay");
    println!();
    println!("Usage:");
    println!("  wx-gateway           Start the webhook server and the OAuth relay");
    println!("  wx-gateway --help    Show this help message");
    println!("  wx-gateway --version Show version");
    println!();
    println!("Environment Variables:");
    println!("  SERVER_URL           Public base URL of this deployment (required)");
    println!("  PAGE_ACCESS_TOKEN    Messenger page access token (required)");
    println!("  VERIFY_TOKEN         Webhook subscription verify token (required)");
    println!("  WIT_TOKEN            NLU engine access token (required)");
    println!("  WEATHER_API_KEY      OpenWeatherMap API key (required)");
    println!("  API42_UID            intra42 OAuth client id (required)");
    println!("  API42_SECRET         intra42 OAuth client secret (required)");
    println!("  API42_HOST           intra42 authorization host (required)");
    println!("  PORT                 Webhook port (default: 5000)");
    println!("  AUTH_PORT            OAuth relay port (default: 5001)");
}

/// Run both services until ctrl-c
async fn run_server(config: Config) -> anyhow::Result<()> {
    let sessions = InMemorySessionStore::new();

    let api = GraphApi::new(
        &config.facebook.page_access_token,
        &config.facebook.verify_token,
    );
    let engine = match &config.nlu.base_url {
        Some(url) => WitClient::with_base_url(&config.nlu.token, url),
        None => WitClient::new(&config.nlu.token),
    };
    let weather = match &config.weather.base_url {
        Some(url) => OpenWeatherClient::with_base_url(&config.weather.api_key, url),
        None => OpenWeatherClient::new(&config.weather.api_key),
    };

    let dispatcher = Arc::new(ActionDispatcher::new(
        Arc::new(engine),
        Arc::new(weather),
        Arc::new(api.clone()),
        sessions.clone(),
    ));
    let handler = Arc::new(MessageHandler::new(
        Arc::new(api.clone()),
        Arc::new(api.clone()),
        sessions.clone(),
        dispatcher,
    ));

    let mut service_handles = Vec::new();

    // Messenger webhook server
    let webhook_state = WebhookState {
        api,
        handler,
    };
    let host = config.server.host.clone();
    let port = config.server.webhook_port;
    let handle = tokio::spawn(async move {
        if let Err(e) = wx_facebook::start_webhook_server(webhook_state, &host, port).await {
            tracing::error!("Webhook server error: {}", e);
        }
    });
    service_handles.push(handle);
    tracing::info!("Messenger webhook server started on port {}", port);

    // OAuth relay
    let oauth = IntraOauthClient::new(
        &config.auth.client_id,
        &config.auth.client_secret,
        &config.auth.host,
        &config.server.base_url,
    );
    let host = config.server.host.clone();
    let port = config.server.auth_port;
    let handle = tokio::spawn(async move {
        if let Err(e) = wx_auth::start_auth_server(AuthRelayState { oauth }, &host, port).await {
            tracing::error!("OAuth relay error: {}", e);
        }
    });
    service_handles.push(handle);
    tracing::info!("OAuth relay started on port {}", port);

    tracing::info!("wx-gateway initialized successfully");
    tracing::info!("Press Ctrl+C to exit");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    for handle in service_handles {
        handle.abort();
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
