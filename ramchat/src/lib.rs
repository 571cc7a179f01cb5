//! # ramchat: Multimodal Chat Relay for Gemini
//!
//! `ramchat` is a small self-hostable chat service. It serves an embedded
//! single-page chat frontend and relays each chat request - free text plus
//! uploaded image, video, and audio files - to the Google Gemini
//! `generateContent` endpoint, returning the generated text to the browser.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer. There is no database and no server-side chat state: the
//! browser keeps its own transcript, and each `POST /api/chat` request is
//! self-contained.
//!
//! ### Request Flow
//!
//! A multipart request to `/api/chat` is parsed into an optional text message
//! and a list of in-memory attachments (bounded by the configured upload
//! ceilings). The [`content`] module classifies attachments by media type,
//! drops unsupported ones, and assembles the ordered part list for the
//! generation call. The [`gemini`] module performs the single upstream round
//! trip and maps upstream failures onto the HTTP error taxonomy in
//! [`errors`]. The reply text goes back to the caller as `{"reply": ...}`.
//!
//! All other GET routes serve the embedded frontend assets with an
//! `index.html` fallback for client-side routing.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use ramchat::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = ramchat::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     ramchat::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config)?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options. The only secret is
//! the Gemini API key, supplied via the `GEMINI_API_KEY` environment
//! variable; without it the server still runs, but chat requests report the
//! missing credential.

pub mod api;
pub mod config;
pub mod content;
pub mod errors;
pub mod gemini;
mod openapi;
mod static_assets;
pub mod telemetry;

#[cfg(test)]
mod test_utils;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use bon::Builder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

pub use config::Config;

use crate::config::CorsOrigin;
use crate::gemini::GeminiClient;

/// Application state shared across all request handlers.
///
/// Holds the loaded configuration and the process-wide Gemini client handle.
/// The client is constructed once at startup and injected here rather than
/// accessed through a global.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub gemini: Arc<GeminiClient>,
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors = &config.cors;

    let mut layer = CorsLayer::new();
    if cors.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard)) {
        layer = layer.allow_origin(Any);
    } else {
        let mut origins = Vec::new();
        for origin in &cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        layer = layer.allow_origin(origins).allow_credentials(cors.allow_credentials);
    }

    if let Some(max_age) = cors.max_age {
        layer = layer.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(layer)
}

/// Build the main application router with all endpoints and middleware.
///
/// This constructs the complete Axum router with:
/// - The chat relay endpoint (with its upload body limit)
/// - The health check endpoint
/// - Interactive API docs at `/docs`
/// - Embedded static asset serving with SPA fallback
/// - CORS configuration and tracing middleware
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let upload_limit = state.config.uploads.max_request_size;

    let api_routes = Router::new()
        .route(
            "/api/chat",
            post(api::handlers::chat::chat).layer(DefaultBodyLimit::max(upload_limit as usize)),
        )
        .route("/api/health", get(api::handlers::health::health))
        .with_state(state.clone());

    // Serve embedded static assets, falling back to index.html for unmatched
    // (client-side) routes
    let fallback = get(api::handlers::static_assets::serve_embedded_asset);

    let router = Router::new()
        .merge(api_routes)
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", openapi::ApiDoc::openapi()).path("/docs"))
        .fallback_service(fallback);

    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns the router and configuration.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] builds the Gemini client and router
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles requests
///    until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting chat relay with configuration: {:#?}", config);

        if config.gemini.api_key.is_none() {
            warn!("GEMINI_API_KEY is not set; /api/chat will fail until a key is configured");
        }

        let gemini = Arc::new(GeminiClient::new(&config.gemini)?);
        let state = AppState::builder().config(config.clone()).gemini(gemini).build();
        let router = build_router(&state)?;

        Ok(Self { router, config })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "ramchat listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
