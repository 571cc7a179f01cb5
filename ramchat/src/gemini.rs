//! Client for the Gemini `generateContent` endpoint.
//!
//! One client is constructed at startup from [`GeminiConfig`] and shared by
//! all request handlers through [`crate::AppState`]. Each call is a single
//! awaited round trip - no retries, no streaming. Upstream failures are
//! classified into the caller-facing error taxonomy by matching well-known
//! substrings of the upstream error message, mirroring how the Gemini API
//! phrases credential and quota problems.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::GeminiConfig;
use crate::content::ContentPart;
use crate::errors::{Error, Result};

pub struct GeminiClient {
    http: Client,
    base_url: Url,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: &'a [ContentPart],
}

// Response models are deliberately loose: the endpoint returns fields we have
// no use for (safety ratings, usage metadata, function-call parts), and those
// must not break text extraction.
#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct UpstreamErrorBody {
    error: UpstreamErrorDetail,
}

#[derive(Deserialize)]
struct UpstreamErrorDetail {
    message: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Relay an ordered part list to Gemini and return the generated text.
    ///
    /// Expects a non-empty part list; the handler validates that before
    /// calling. Fails without touching the network when no API key is
    /// configured.
    #[instrument(skip_all, fields(parts = parts.len(), model = %self.model))]
    pub async fn generate(&self, parts: &[ContentPart]) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(Error::ApiKeyMissing);
        };

        let url = self.endpoint()?;
        let body = GenerateContentRequest {
            contents: [RequestContent {
                role: "user",
                parts,
            }],
        };

        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Upstream {
                message: format!("request to Gemini failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_else(|e| {
                format!("failed to read error response body (status {status}): {e}")
            });
            warn!(%status, "Gemini returned an error response");
            return Err(classify_upstream_error(&raw));
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| Error::Upstream {
                message: format!("failed to parse Gemini response: {e}"),
            })?;

        debug!(candidates = parsed.candidates.len(), "Gemini response received");

        reply_text(&parsed).ok_or_else(|| Error::Upstream {
            message: "no text in Gemini response".to_string(),
        })
    }

    fn endpoint(&self) -> Result<Url> {
        self.base_url
            .join(&format!("v1beta/models/{}:generateContent", self.model))
            .map_err(|e| {
                Error::Other(anyhow::anyhow!("invalid Gemini endpoint URL: {e}"))
            })
    }
}

/// Concatenated text parts of the primary candidate, or `None` when the
/// response carried no text at all.
fn reply_text(response: &GenerateContentResponse) -> Option<String> {
    let content = response.candidates.first()?.content.as_ref()?;
    let fragments: Vec<&str> = content
        .parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect();

    if fragments.is_empty() {
        None
    } else {
        Some(fragments.concat())
    }
}

/// Map an upstream error payload onto the caller-facing taxonomy.
///
/// The Gemini API wraps failures as `{"error": {"message": ...}}`; a body
/// that does not parse is used verbatim. Matching is a case-sensitive
/// substring check on the message, credential problems taking precedence
/// over quota ones.
fn classify_upstream_error(raw_body: &str) -> Error {
    let message = serde_json::from_str::<UpstreamErrorBody>(raw_body)
        .map(|body| body.error.message)
        .unwrap_or_else(|_| raw_body.to_string());

    if message.contains("API key") {
        Error::Unauthorized { message }
    } else if message.contains("quota") {
        Error::QuotaExceeded { message }
    } else {
        Error::Upstream { message }
    }
}
