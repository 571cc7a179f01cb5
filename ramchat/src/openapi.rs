//! OpenAPI documentation configuration.
//!
//! All endpoints are annotated with `utoipa` and rendered interactively at
//! `/docs` when the server is running.

use utoipa::OpenApi;

use crate::api;
use crate::errors;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ramchat API",
        description = "Multimodal chat relay: forwards text and media uploads to the Google Gemini API and returns the generated reply."
    ),
    paths(api::handlers::chat::chat, api::handlers::health::health),
    components(schemas(
        api::models::chat::ChatResponse,
        api::models::health::HealthResponse,
        errors::ErrorResponse,
    )),
    tags(
        (name = "chat", description = "Chat relay endpoint"),
        (name = "health", description = "Liveness checks"),
    )
)]
pub struct ApiDoc;
