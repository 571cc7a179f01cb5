//! HTTP handler for the chat relay endpoint.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use tracing::debug;

use crate::api::models::chat::ChatResponse;
use crate::content::{self, Attachment};
use crate::errors::{Error, ErrorResponse, Result};
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    summary = "Send a chat message",
    description = "Relays a text message and/or uploaded media files to Gemini and returns the generated reply.

The request is a multipart form with an optional `message` text field and any number of repeated `files` fields. Files whose media type is not an accepted image, video, or audio type are dropped silently.",
    request_body(
        content_type = "multipart/form-data",
        description = "Optional `message` text field plus repeated `files` fields"
    ),
    responses(
        (status = 200, description = "Reply generated successfully", body = ChatResponse),
        (status = 400, description = "Neither a message nor a relayable file was provided", body = ErrorResponse),
        (status = 401, description = "Gemini rejected the configured API key", body = ErrorResponse),
        (status = 413, description = "An upload exceeded the configured size ceiling", body = ErrorResponse),
        (status = 429, description = "Gemini quota exhausted", body = ErrorResponse),
        (status = 500, description = "Missing server credential or unclassified upstream failure", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn chat(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ChatResponse>> {
    let max_file_size = state.config.uploads.max_file_size;

    let mut message: Option<String> = None;
    let mut attachments: Vec<Attachment> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "message" => {
                message = Some(field.text().await.map_err(multipart_error)?);
            }
            "files" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let media_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();

                let bytes = field.bytes().await.map_err(multipart_error)?;
                if bytes.len() as u64 > max_file_size {
                    return Err(Error::PayloadTooLarge {
                        message: format!(
                            "File {} exceeds the maximum allowed size of {} bytes",
                            filename, max_file_size
                        ),
                    });
                }

                debug!(
                    filename = %filename,
                    media_type = %media_type,
                    size = bytes.len(),
                    "received attachment"
                );

                attachments.push(Attachment {
                    filename,
                    media_type,
                    bytes,
                });
            }
            other => {
                debug!(field = %other, "ignoring unknown multipart field");
            }
        }
    }

    let has_text = message.as_deref().is_some_and(|m| !m.trim().is_empty());
    if !has_text && attachments.is_empty() {
        return Err(Error::BadRequest {
            message: "Message or files are required".to_string(),
        });
    }

    let parts = content::normalize(
        message.as_deref(),
        &attachments,
        &state.config.uploads.accepted_media_prefixes,
    );

    // Every attachment may have been dropped as unsupported; without text
    // there is nothing left to relay
    if parts.is_empty() {
        return Err(Error::BadRequest {
            message: "Message or files are required".to_string(),
        });
    }

    let reply = state.gemini.generate(&parts).await?;
    Ok(Json(ChatResponse { reply }))
}

fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge {
            message: "Request body exceeds the configured upload limit".to_string(),
        }
    } else {
        Error::BadRequest {
            message: format!("Failed to parse multipart data: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::ErrorResponse;
    use crate::test_utils::{create_test_server, test_config};
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/v1beta/models/gemini-1.5-pro:generateContent";

    fn reply_with(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        }))
    }

    #[tokio::test]
    async fn test_empty_request_returns_400() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply_with("never"))
            .expect(0)
            .mount(&upstream)
            .await;

        let server = create_test_server(test_config(&upstream.uri(), Some("test-key")));
        let response = server
            .post("/api/chat")
            .multipart(MultipartForm::new())
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.error, "Message or files are required");
    }

    #[tokio::test]
    async fn test_whitespace_message_counts_as_empty() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply_with("never"))
            .expect(0)
            .mount(&upstream)
            .await;

        let server = create_test_server(test_config(&upstream.uri(), Some("test-key")));
        let response = server
            .post("/api/chat")
            .multipart(MultipartForm::new().add_text("message", "   \n"))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[test_log::test(tokio::test)]
    async fn test_text_message_is_relayed() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(body_partial_json(
                json!({"contents": [{"role": "user", "parts": [{"text": "hello"}]}]}),
            ))
            .respond_with(reply_with("hi there"))
            .expect(1)
            .mount(&upstream)
            .await;

        let server = create_test_server(test_config(&upstream.uri(), Some("test-key")));
        let response = server
            .post("/api/chat")
            .multipart(MultipartForm::new().add_text("message", "hello"))
            .await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body, json!({"reply": "hi there"}));
    }

    #[tokio::test]
    async fn test_image_attachment_is_inlined_after_text() {
        let image_bytes: &[u8] = b"\x89PNG\r\n\x1a\nfake";
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(body_partial_json(json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "what is this?"},
                        {"inlineData": {"mimeType": "image/png", "data": BASE64.encode(image_bytes)}},
                    ]
                }]
            })))
            .respond_with(reply_with("a picture"))
            .expect(1)
            .mount(&upstream)
            .await;

        let server = create_test_server(test_config(&upstream.uri(), Some("test-key")));
        let form = MultipartForm::new()
            .add_text("message", "what is this?")
            .add_part(
                "files",
                Part::bytes(image_bytes.to_vec())
                    .file_name("photo.png")
                    .mime_type("image/png"),
            );

        let response = server.post("/api/chat").multipart(form).await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["reply"], "a picture");
    }

    #[tokio::test]
    async fn test_only_unsupported_files_returns_400() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply_with("never"))
            .expect(0)
            .mount(&upstream)
            .await;

        let server = create_test_server(test_config(&upstream.uri(), Some("test-key")));
        let form = MultipartForm::new().add_part(
            "files",
            Part::bytes(b"%PDF-1.7".to_vec())
                .file_name("paper.pdf")
                .mime_type("application/pdf"),
        );

        let response = server.post("/api/chat").multipart(form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unsupported_files_are_dropped_not_relayed() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(body_partial_json(
                json!({"contents": [{"role": "user", "parts": [{"text": "see attachment"}]}]}),
            ))
            .respond_with(reply_with("noted"))
            .expect(1)
            .mount(&upstream)
            .await;

        let server = create_test_server(test_config(&upstream.uri(), Some("test-key")));
        let form = MultipartForm::new()
            .add_text("message", "see attachment")
            .add_part(
                "files",
                Part::bytes(b"PK\x03\x04".to_vec())
                    .file_name("archive.zip")
                    .mime_type("application/zip"),
            );

        let response = server.post("/api/chat").multipart(form).await;
        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_api_key_returns_500_without_upstream_call() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply_with("never"))
            .expect(0)
            .mount(&upstream)
            .await;

        let server = create_test_server(test_config(&upstream.uri(), None));
        let response = server
            .post("/api/chat")
            .multipart(MultipartForm::new().add_text("message", "hello"))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = response.json();
        assert_eq!(body.error, "Gemini API key not configured");
    }

    #[tokio::test]
    async fn test_upstream_credential_rejection_maps_to_401() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "API key revoked", "status": "INVALID_ARGUMENT"}
            })))
            .mount(&upstream)
            .await;

        let server = create_test_server(test_config(&upstream.uri(), Some("stale-key")));
        let response = server
            .post("/api/chat")
            .multipart(MultipartForm::new().add_text("message", "hello"))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = response.json();
        assert_eq!(body.error, "Invalid API key");
        assert!(body.details.is_none());
    }

    #[tokio::test]
    async fn test_upstream_quota_exhaustion_maps_to_429() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"code": 429, "message": "quota exceeded for project", "status": "RESOURCE_EXHAUSTED"}
            })))
            .mount(&upstream)
            .await;

        let server = create_test_server(test_config(&upstream.uri(), Some("test-key")));
        let response = server
            .post("/api/chat")
            .multipart(MultipartForm::new().add_text("message", "hello"))
            .await;

        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
        let body: ErrorResponse = response.json();
        assert_eq!(body.error, "API quota exceeded");
    }

    #[tokio::test]
    async fn test_other_upstream_failures_map_to_500_with_details() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": {"code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE"}
            })))
            .mount(&upstream)
            .await;

        let server = create_test_server(test_config(&upstream.uri(), Some("test-key")));
        let response = server
            .post("/api/chat")
            .multipart(MultipartForm::new().add_text("message", "hello"))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = response.json();
        assert_eq!(body.error, "Failed to generate response");
        assert_eq!(body.details.as_deref(), Some("The model is overloaded."));
    }

    #[tokio::test]
    async fn test_oversize_file_returns_413() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply_with("never"))
            .expect(0)
            .mount(&upstream)
            .await;

        let mut config = test_config(&upstream.uri(), Some("test-key"));
        config.uploads.max_file_size = 16;
        config.uploads.max_request_size = 1024 * 1024;

        let server = create_test_server(config);
        let form = MultipartForm::new().add_part(
            "files",
            Part::bytes(vec![0u8; 64])
                .file_name("big.png")
                .mime_type("image/png"),
        );

        let response = server.post("/api/chat").multipart(form).await;
        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    }
}
