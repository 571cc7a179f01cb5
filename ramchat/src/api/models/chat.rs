use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Reply to a chat request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    /// Text generated by the model
    pub reply: String,
}
