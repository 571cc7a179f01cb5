//! Assembly of chat requests into ordered Gemini content parts.
//!
//! A chat request arrives as an optional text message plus zero or more
//! uploaded files. [`normalize`] turns that pair into the ordered part list
//! the Gemini generation endpoint expects: the text part first (when present),
//! then one inline-data part per retained attachment, in arrival order. The
//! ordering is significant - Gemini grounds multimodal answers on part
//! positions.
//!
//! Attachments whose media type is not on the accepted list are dropped, not
//! rejected: a request mixing a photo with a stray PDF still relays the photo.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A single uploaded file, held in memory for the lifetime of one request.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub media_type: String,
    pub bytes: Bytes,
}

/// One unit of content submitted to the generation call.
///
/// Serializes to the exact Gemini REST wire shape: `{"text": ...}` or
/// `{"inlineData": {"mimeType": ..., "data": <base64>}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Build an inline-data part, base64-encoding the raw bytes.
    pub fn inline(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        ContentPart::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: BASE64.encode(bytes),
            },
        }
    }
}

/// Turn a chat request into the ordered part list for the generation call.
///
/// Emits the trimmed text first when non-empty, then one part per attachment
/// whose media type starts with one of `accepted_prefixes`. Unsupported
/// attachments are skipped silently (logged only). Never fails; an empty
/// return means the request had no relayable content.
pub fn normalize(
    message: Option<&str>,
    attachments: &[Attachment],
    accepted_prefixes: &[String],
) -> Vec<ContentPart> {
    let mut parts = Vec::with_capacity(1 + attachments.len());

    if let Some(text) = message {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(ContentPart::text(trimmed));
        }
    }

    for attachment in attachments {
        let accepted = accepted_prefixes
            .iter()
            .any(|prefix| attachment.media_type.starts_with(prefix.as_str()));
        if !accepted {
            debug!(
                filename = %attachment.filename,
                media_type = %attachment.media_type,
                "skipping attachment with unsupported media type"
            );
            continue;
        }

        if attachment.media_type.starts_with("audio/") {
            // Forwarded best-effort: not every Gemini model accepts audio input.
            warn!(
                filename = %attachment.filename,
                "forwarding audio attachment; the configured model may not support it"
            );
        }

        parts.push(ContentPart::inline(
            attachment.media_type.clone(),
            &attachment.bytes,
        ));
    }

    parts
}
