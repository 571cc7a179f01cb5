//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The file path defaults to `config.yaml` but can be specified
//! via the `-f` flag or the `RAMCHAT_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Sources are merged in order (later sources override earlier ones):
//!
//! 1. **YAML config file** - base configuration (default: `config.yaml`)
//! 2. **Environment variables** - variables prefixed with `RAMCHAT_`
//! 3. **GEMINI_API_KEY** - special case: overrides `gemini.api_key` if set
//!
//! For nested values, use double underscores in environment variables, e.g.
//! `RAMCHAT_GEMINI__MODEL=gemini-1.5-flash` sets the `gemini.model` field.
//!
//! A missing API key is not a startup error: the server runs and serves the
//! frontend and health endpoint, and `/api/chat` reports the missing
//! credential per request.

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;
use url::Url;

/// Simple CLI args - just for specifying the config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "RAMCHAT_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Gemini upstream configuration
    pub gemini: GeminiConfig,
    /// Upload handling configuration
    pub uploads: UploadConfig,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
}

/// Configuration for the Gemini upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeminiConfig {
    /// API credential. Usually supplied via the GEMINI_API_KEY environment
    /// variable rather than the config file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model to request, e.g. "gemini-1.5-pro"
    pub model: String,
    /// Base URL of the generative language API
    pub base_url: Url,
    /// Upper bound on one generation round trip (e.g. "120s")
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

/// Upload ceilings and media-type acceptance for `/api/chat`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Maximum size of a single uploaded file, in bytes
    pub max_file_size: u64,
    /// Maximum size of the whole multipart request body, in bytes
    pub max_request_size: u64,
    /// Media-type prefixes relayed to the model; anything else is dropped
    pub accepted_media_prefixes: Vec<String>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Origins allowed to call the API ("*" or absolute URLs)
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// A single allowed CORS origin.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://chat.example.com`)
    Url(Url),
}

impl Serialize for CorsOrigin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CorsOrigin::Wildcard => serializer.serialize_str("*"),
            CorsOrigin::Url(url) => serializer.serialize_str(url.as_str()),
        }
    }
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        // GEMINI_API_KEY wins over anything in the config file, so the secret
        // can live in the environment while everything else is versioned
        if let Ok(key) = std::env::var("GEMINI_API_KEY")
            && !key.is_empty()
        {
            config.gemini.api_key = Some(key);
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            // RAMCHAT_CONFIG selects the file itself (handled by clap), it is
            // not a config value
            .merge(Env::prefixed("RAMCHAT_").ignore(&["config"]).split("__"))
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.uploads.max_file_size == 0 {
            anyhow::bail!("Config validation: uploads.max_file_size must be greater than zero");
        }
        if self.uploads.max_request_size < self.uploads.max_file_size {
            anyhow::bail!(
                "Config validation: uploads.max_request_size ({}) cannot be smaller than uploads.max_file_size ({})",
                self.uploads.max_request_size,
                self.uploads.max_file_size
            );
        }

        let has_wildcard = self
            .cors
            .allowed_origins
            .iter()
            .any(|origin| matches!(origin, CorsOrigin::Wildcard));
        if has_wildcard && self.cors.allow_credentials {
            anyhow::bail!(
                "Config validation: CORS cannot use wildcard origin '*' with allow_credentials=true. Specify explicit origins."
            );
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            gemini: GeminiConfig::default(),
            uploads: UploadConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-pro".to_string(),
            base_url: Url::parse("https://generativelanguage.googleapis.com/").unwrap(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_request_size: 50 * 1024 * 1024,
            accepted_media_prefixes: vec![
                "image/".to_string(),
                "video/".to_string(),
                "audio/".to_string(),
            ],
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            allow_credentials: false,
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}
