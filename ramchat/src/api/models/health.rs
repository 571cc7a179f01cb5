use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Fixed liveness message
    pub message: String,
    /// Server time at the moment of the check (RFC 3339)
    pub timestamp: DateTime<Utc>,
}
