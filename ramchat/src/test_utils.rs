//! Shared helpers for handler tests.

use std::sync::Arc;

use axum_test::TestServer;

use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::{AppState, build_router};

/// Default config pointed at a (usually mocked) upstream base URL.
pub fn test_config(gemini_base: &str, api_key: Option<&str>) -> Config {
    let mut config = Config::default();
    config.gemini.base_url = gemini_base.parse().expect("valid test base URL");
    config.gemini.api_key = api_key.map(str::to_string);
    config
}

/// Build a test server running the full router for the given config.
pub fn create_test_server(config: Config) -> TestServer {
    let gemini = Arc::new(GeminiClient::new(&config.gemini).expect("Failed to build Gemini client"));
    let state = AppState::builder().config(config).gemini(gemini).build();
    let router = build_router(&state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}
