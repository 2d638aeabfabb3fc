use anyhow::{Context, Result};
use axum::extract::FromRef;
use reqwest::Client;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Settings;

// Declare modules
mod availability;
mod calendar_view;
mod config;
mod error;
mod hostaway;
mod models;
mod pricing;
mod routes;
mod selection;
mod sync;
mod webflow;
mod widget;

// Shared application state handed to every handler
#[derive(Clone, FromRef)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub http_client: Arc<Client>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first; ignore a missing file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookingsync_rust=info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .init();

    tracing::info!("Initializing booking sync server...");

    let settings = match Settings::new() {
        Ok(s) => {
            tracing::info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };
    let shared_settings = Arc::new(settings);

    let http_client = Arc::new(
        Client::builder()
            .user_agent("bookingsync-rust/0.1")
            .build()
            .context("Failed to build shared reqwest client")?,
    );

    let app_state = AppState {
        settings: shared_settings.clone(),
        http_client,
    };

    let app = routes::create_router(app_state).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&shared_settings.server_address)
        .await
        .with_context(|| format!("Failed to bind to {}", shared_settings.server_address))?;
    tracing::info!("Listening on {}", shared_settings.server_address);

    axum::serve(listener, app)
        .await
        .context("Server error")?;
    Ok(())
}
